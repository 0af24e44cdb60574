// src/charts.rs
use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use itertools::Itertools;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ChartConfig;
use crate::models::{LocalLabel, SentimentLabel};
use crate::results::ResultRow;

/* -------------------------------------------------------------------------- */
/* Entry points                                                               */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Distribution,
    Comparison,
    Scores,
    TopKeyPhrases,
    ByLength,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Distribution,
        ChartKind::Comparison,
        ChartKind::Scores,
        ChartKind::TopKeyPhrases,
        ChartKind::ByLength,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ChartKind::Distribution => "sentiment_distribution.png",
            ChartKind::Comparison => "sentiment_comparison.png",
            ChartKind::Scores => "sentiment_scores.png",
            ChartKind::TopKeyPhrases => "top_key_phrases.png",
            ChartKind::ByLength => "sentiment_by_length.png",
        }
    }

    pub fn title(&self, cfg: &ChartConfig) -> String {
        match self {
            ChartKind::Distribution => "Remote Sentiment Distribution".into(),
            ChartKind::Comparison => "Local vs Remote Sentiment Comparison".into(),
            ChartKind::Scores => "Distribution of Remote Sentiment Scores".into(),
            ChartKind::TopKeyPhrases => format!("Top {} Key Phrases", cfg.top_phrases),
            ChartKind::ByLength => "Sentiment Distribution by Text Length".into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChartReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(ChartKind, String)>,
}

#[derive(Debug, Clone)]
pub struct InlineChart {
    pub kind: ChartKind,
    pub title: String,
    pub png_base64: String,
}

/// Render every chart into `dir`. A chart that fails is logged and skipped.
pub fn write_all_charts(dir: &Path, rows: &[ResultRow], cfg: &ChartConfig) -> Result<ChartReport> {
    let start = std::time::Instant::now();
    fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;

    let mut report = ChartReport::default();
    for (kind, rendered) in render_all(rows, cfg) {
        let path = dir.join(kind.file_name());
        match rendered.and_then(|png| fs::write(&path, png).with_context(|| format!("write {}", path.display()))) {
            Ok(()) => {
                debug!("Wrote {}", path.display());
                report.written.push(path);
            }
            Err(e) => {
                warn!("Chart skipped - chart={}, error={:#}", kind.file_name(), e);
                report.failed.push((kind, format!("{:#}", e)));
            }
        }
    }

    info!(
        "Charts completed - duration={:.2}s, written={}, failed={}, dir={}",
        start.elapsed().as_secs_f32(),
        report.written.len(),
        report.failed.len(),
        dir.display()
    );
    Ok(report)
}

/// Same charts as base64 PNGs, for embedding in a page.
pub fn render_inline(rows: &[ResultRow], cfg: &ChartConfig) -> (Vec<InlineChart>, Vec<(ChartKind, String)>) {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut charts = Vec::new();
    let mut failed = Vec::new();
    for (kind, rendered) in render_all(rows, cfg) {
        match rendered {
            Ok(png) => charts.push(InlineChart {
                kind,
                title: kind.title(cfg),
                png_base64: engine.encode(png),
            }),
            Err(e) => {
                warn!("Chart skipped - chart={}, error={:#}", kind.file_name(), e);
                failed.push((kind, format!("{:#}", e)));
            }
        }
    }
    (charts, failed)
}

fn render_all(rows: &[ResultRow], cfg: &ChartConfig) -> Vec<(ChartKind, Result<Vec<u8>>)> {
    let analyzed: Vec<&ResultRow> = rows.iter().filter(|r| !r.is_error() && r.remote_label().is_some()).collect();
    debug!("Rendering charts - rows={}, analyzed={}", rows.len(), analyzed.len());

    ChartKind::ALL
        .par_iter()
        .map(|&kind| (kind, render_chart(kind, &analyzed, cfg)))
        .collect()
}

fn render_chart(kind: ChartKind, rows: &[&ResultRow], cfg: &ChartConfig) -> Result<Vec<u8>> {
    if rows.is_empty() {
        bail!("no analyzed rows to plot");
    }
    let title = kind.title(cfg);
    match kind {
        ChartKind::Distribution => {
            let counts = label_counts(rows);
            render_png(cfg.width, cfg.height, |root| draw_pie(root, &title, &counts))
        }
        ChartKind::Comparison => {
            let table = crosstab(rows);
            render_png(cfg.width, cfg.height, |root| draw_comparison(root, &title, &table))
        }
        ChartKind::Scores => {
            let stats = score_box_stats(rows)?;
            render_png(cfg.width, cfg.height, |root| draw_boxplot(root, &title, &stats))
        }
        ChartKind::TopKeyPhrases => {
            let top = top_key_phrases(rows, cfg.top_phrases)?;
            // taller canvas like a 12x8 figure
            let height = cfg.height * 4 / 3;
            render_png(cfg.wide_width, height, |root| draw_top_phrases(root, &title, &top))
        }
        ChartKind::ByLength => {
            let buckets = length_buckets(rows, cfg.length_buckets)?;
            render_png(cfg.wide_width, cfg.height, |root| draw_by_length(root, &title, &buckets))
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Data preparation                                                           */
/* -------------------------------------------------------------------------- */

/// Frequency of each remote label, most frequent first.
pub fn label_counts(rows: &[&ResultRow]) -> Vec<(SentimentLabel, usize)> {
    let mut counts: HashMap<SentimentLabel, usize> = HashMap::new();
    for r in rows {
        if let Some(l) = r.remote_label() {
            *counts.entry(l).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .collect()
}

/// local label (rows) x remote label (stack), labels alphabetical.
/// MIXED only ever shows up on the remote side.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    pub locals: Vec<LocalLabel>,
    pub remotes: Vec<SentimentLabel>,
    pub counts: Vec<Vec<usize>>, // [local][remote]
}

pub fn crosstab(rows: &[&ResultRow]) -> CrossTab {
    let pairs: Vec<(LocalLabel, SentimentLabel)> = rows
        .iter()
        .filter_map(|r| Some((r.local_label()?, r.remote_label()?)))
        .collect();

    let mut locals: Vec<LocalLabel> = pairs.iter().map(|p| p.0).collect();
    locals.sort_by_key(|l| l.as_str());
    locals.dedup();
    let mut remotes: Vec<SentimentLabel> = pairs.iter().map(|p| p.1).collect();
    remotes.sort_by_key(|l| l.as_str());
    remotes.dedup();

    let mut counts = vec![vec![0usize; remotes.len()]; locals.len()];
    for (l, r) in pairs {
        let li = locals.iter().position(|x| *x == l).unwrap_or(0);
        let ri = remotes.iter().position(|x| *x == r).unwrap_or(0);
        counts[li][ri] += 1;
    }
    CrossTab { locals, remotes, counts }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
    pub outliers: Vec<f64>,
}

/// Linear-interpolated percentile over sorted values, `p` in [0, 1].
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Box statistics with whiskers at 1.5 IQR. `None` for no values.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&v, 0.25);
    let median = percentile(&v, 0.5);
    let q3 = percentile(&v, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside: Vec<f64> = v.iter().copied().filter(|x| *x >= lo_fence && *x <= hi_fence).collect();
    let whisker_lo = inside.first().copied().unwrap_or(q1);
    let whisker_hi = inside.last().copied().unwrap_or(q3);
    let outliers = v.into_iter().filter(|x| *x < lo_fence || *x > hi_fence).collect();

    Some(BoxStats { q1, median, q3, whisker_lo, whisker_hi, outliers })
}

/// One box per score dimension, in Positive/Negative/Neutral/Mixed order.
pub fn score_box_stats(rows: &[&ResultRow]) -> Result<Vec<(SentimentLabel, BoxStats)>> {
    let scores: Vec<[f64; 4]> = rows.iter().filter_map(|r| r.scores()).map(|s| s.as_array()).collect();
    if scores.is_empty() {
        bail!("no sentiment scores to plot");
    }
    SentimentLabel::ALL
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let column: Vec<f64> = scores.iter().map(|s| s[i]).collect();
            box_stats(&column)
                .map(|b| (*label, b))
                .ok_or_else(|| anyhow!("no finite {} scores", label))
        })
        .collect()
}

/// Most frequent key phrases across rows; ties keep first-seen order.
pub fn top_key_phrases(rows: &[&ResultRow], n: usize) -> Result<Vec<(String, usize)>> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in rows {
        for phrase in r.key_phrase_list() {
            let c = counts.entry(phrase.clone()).or_insert(0);
            if *c == 0 {
                order.push(phrase);
            }
            *c += 1;
        }
    }
    if order.is_empty() {
        bail!("no key phrases to plot");
    }
    let mut v: Vec<(String, usize)> = order
        .into_iter()
        .map(|p| {
            let c = counts.get(&p).copied().unwrap_or(0);
            (p, c)
        })
        .collect();
    // stable: equal counts stay in first-seen order
    v.sort_by(|a, b| b.1.cmp(&a.1));
    v.truncate(n);
    Ok(v)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LengthBuckets {
    pub edges: Vec<f64>,
    pub labels: Vec<SentimentLabel>,
    /// [bucket][label], each non-empty bucket sums to 1
    pub proportions: Vec<Vec<f64>>,
    pub totals: Vec<usize>,
}

impl LengthBuckets {
    pub fn bucket_name(&self, i: usize) -> String {
        format!("({:.1}, {:.1}]", self.edges[i], self.edges[i + 1])
    }
}

/// Equal-width, right-closed bins over the text lengths.
fn bin_edges(min: f64, max: f64, n: usize) -> Vec<f64> {
    let (lo, hi) = if min == max {
        let lo = if min != 0.0 { min - 0.001 * min.abs() } else { -0.001 };
        let hi = if max != 0.0 { max + 0.001 * max.abs() } else { 0.001 };
        (lo, hi)
    } else {
        (min, max)
    };
    let step = (hi - lo) / n as f64;
    let mut edges: Vec<f64> = (0..=n).map(|i| lo + step * i as f64).collect();
    edges[n] = hi;
    if min != max {
        // widen the first bin so the minimum falls inside (lo, ...]
        edges[0] -= (max - min) * 0.001;
    }
    edges
}

pub fn length_buckets(rows: &[&ResultRow], n: usize) -> Result<LengthBuckets> {
    if n == 0 {
        bail!("length bucket count must be positive");
    }
    let items: Vec<(f64, SentimentLabel)> = rows
        .iter()
        .filter_map(|r| Some((r.text_length() as f64, r.remote_label()?)))
        .collect();
    if items.is_empty() {
        bail!("no labelled rows to bucket");
    }

    let min = items.iter().map(|i| i.0).fold(f64::INFINITY, f64::min);
    let max = items.iter().map(|i| i.0).fold(f64::NEG_INFINITY, f64::max);
    let edges = bin_edges(min, max, n);

    let mut labels: Vec<SentimentLabel> = items.iter().map(|i| i.1).collect();
    labels.sort_by_key(|l| l.as_str());
    labels.dedup();

    let mut counts = vec![vec![0usize; labels.len()]; n];
    for (len, label) in &items {
        let b = edges
            .windows(2)
            .position(|w| *len > w[0] && *len <= w[1])
            .unwrap_or(n - 1);
        let li = labels.iter().position(|l| l == label).unwrap_or(0);
        counts[b][li] += 1;
    }

    let totals: Vec<usize> = counts.iter().map(|row| row.iter().sum()).collect();
    let proportions = counts
        .iter()
        .zip(&totals)
        .map(|(row, &t)| {
            row.iter()
                .map(|&c| if t > 0 { c as f64 / t as f64 } else { 0.0 })
                .collect()
        })
        .collect();

    Ok(LengthBuckets { edges, labels, proportions, totals })
}

/* -------------------------------------------------------------------------- */
/* Rendering                                                                  */
/* -------------------------------------------------------------------------- */

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const TITLE_FONT: (&str, u32) = ("sans-serif", 28);
const LABEL_FONT: (&str, u32) = ("sans-serif", 16);

fn label_color(label: SentimentLabel) -> RGBColor {
    match label {
        SentimentLabel::Positive => RGBColor(76, 175, 80),
        SentimentLabel::Negative => RGBColor(229, 57, 53),
        SentimentLabel::Neutral => RGBColor(66, 133, 244),
        SentimentLabel::Mixed => RGBColor(255, 167, 38),
    }
}

/// Draw into an RGB buffer and encode it as PNG.
fn render_png<F>(width: u32, height: u32, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Area<'_>) -> Result<()>,
{
    let mut buf = vec![0u8; (width as usize) * (height as usize) * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    let img = image::RgbImage::from_raw(width, height, buf).ok_or_else(|| anyhow!("pixel buffer size mismatch"))?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

fn draw_pie(root: &Area<'_>, title: &str, counts: &[(SentimentLabel, usize)]) -> Result<()> {
    let total: usize = counts.iter().map(|c| c.1).sum();
    if total == 0 {
        bail!("no labels to plot");
    }
    let area = root.titled(title, TITLE_FONT)?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.38;
    let centered = Pos::new(HPos::Center, VPos::Center);

    let mut angle = -std::f64::consts::FRAC_PI_2; // 12 o'clock, clockwise
    for (label, count) in counts {
        let share = *count as f64 / total as f64;
        let sweep = share * std::f64::consts::TAU;
        let steps = ((sweep.to_degrees()).ceil() as usize).max(2);

        let mut points = vec![(center.0 as i32, center.1 as i32)];
        for s in 0..=steps {
            let a = angle + sweep * s as f64 / steps as f64;
            points.push(((center.0 + radius * a.cos()) as i32, (center.1 + radius * a.sin()) as i32));
        }
        area.draw(&Polygon::new(points, label_color(*label).filled()))?;

        let mid = angle + sweep / 2.0;
        let at = |r: f64| ((center.0 + r * mid.cos()) as i32, (center.1 + r * mid.sin()) as i32);
        area.draw(&Text::new(
            label.to_string(),
            at(radius * 1.18),
            TextStyle::from(LABEL_FONT.into_font()).pos(centered),
        ))?;
        area.draw(&Text::new(
            format!("{:.1}%", share * 100.0),
            at(radius * 0.6),
            TextStyle::from(LABEL_FONT.into_font()).color(&WHITE).pos(centered),
        ))?;

        angle += sweep;
    }
    Ok(())
}

fn draw_comparison(root: &Area<'_>, title: &str, table: &CrossTab) -> Result<()> {
    if table.locals.is_empty() {
        bail!("no label pairs to compare");
    }
    let n = table.locals.len();
    let y_max = table.counts.iter().map(|row| row.iter().sum::<usize>()).max().unwrap_or(1) as f64 * 1.15;
    let names: Vec<String> = table.locals.iter().map(|l| l.to_string()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max.max(1.0))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Local Sentiment")
        .y_desc("Count")
        .label_style(LABEL_FONT)
        .x_label_formatter(&|v| segment_name(v, &names))
        .draw()?;

    let mut base = vec![0f64; n];
    for (ri, remote) in table.remotes.iter().enumerate() {
        let color = label_color(*remote);
        let mut bars = Vec::new();
        for li in 0..n {
            let c = table.counts[li][ri] as f64;
            if c > 0.0 {
                bars.push(bar(li, base[li], base[li] + c, color));
                base[li] += c;
            }
        }
        chart
            .draw_series(bars)?
            .label(remote.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(LABEL_FONT)
        .draw()?;
    Ok(())
}

fn draw_boxplot(root: &Area<'_>, title: &str, stats: &[(SentimentLabel, BoxStats)]) -> Result<()> {
    let n = stats.len();
    let names: Vec<String> = stats
        .iter()
        .map(|(l, _)| {
            let s = l.as_str();
            format!("{}{}", &s[..1], s[1..].to_lowercase())
        })
        .collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), -0.02f64..1.05f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Score")
        .label_style(LABEL_FONT)
        .x_label_formatter(&|v| segment_name(v, &names))
        .draw()?;

    let box_color = RGBColor(66, 133, 244);
    for (i, (_, b)) in stats.iter().enumerate() {
        let mut body = Rectangle::new(
            [(SegmentValue::Exact(i), b.q1), (SegmentValue::Exact(i + 1), b.q3)],
            box_color.mix(0.35).filled(),
        );
        body.set_margin(0, 0, 40, 40);
        let mut outline = Rectangle::new(
            [(SegmentValue::Exact(i), b.q1), (SegmentValue::Exact(i + 1), b.q3)],
            box_color.stroke_width(2),
        );
        outline.set_margin(0, 0, 40, 40);
        chart.draw_series([body, outline])?;

        // zero-height rectangles render as horizontal strokes
        let hline = |y: f64, inset: u32, style: ShapeStyle| {
            let mut r = Rectangle::new([(SegmentValue::Exact(i), y), (SegmentValue::Exact(i + 1), y)], style);
            r.set_margin(0, 0, inset, inset);
            r
        };
        chart.draw_series([
            hline(b.median, 40, RGBColor(255, 152, 0).stroke_width(3)),
            hline(b.whisker_lo, 60, BLACK.stroke_width(1)),
            hline(b.whisker_hi, 60, BLACK.stroke_width(1)),
        ])?;

        chart.draw_series([
            PathElement::new(
                vec![(SegmentValue::CenterOf(i), b.whisker_lo), (SegmentValue::CenterOf(i), b.q1)],
                BLACK.stroke_width(1),
            ),
            PathElement::new(
                vec![(SegmentValue::CenterOf(i), b.q3), (SegmentValue::CenterOf(i), b.whisker_hi)],
                BLACK.stroke_width(1),
            ),
        ])?;

        chart.draw_series(
            b.outliers
                .iter()
                .map(|&v| Circle::new((SegmentValue::CenterOf(i), v), 3, BLACK.stroke_width(1))),
        )?;
    }
    Ok(())
}

fn draw_top_phrases(root: &Area<'_>, title: &str, top: &[(String, usize)]) -> Result<()> {
    let n = top.len();
    // most frequent at the top
    let ordered: Vec<&(String, usize)> = top.iter().rev().collect();
    let names: Vec<String> = ordered.iter().map(|(p, _)| truncate_label(p, 32)).collect();
    let x_max = ordered.iter().map(|(_, c)| *c).max().unwrap_or(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(260)
        .build_cartesian_2d(0f64..x_max.max(1.0), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Count")
        .label_style(LABEL_FONT)
        .y_labels(n)
        .y_label_formatter(&|v| segment_name(v, &names))
        .draw()?;

    let color = RGBColor(66, 133, 244);
    chart.draw_series(ordered.iter().enumerate().map(|(i, (_, c))| {
        let mut r = Rectangle::new(
            [(0f64, SegmentValue::Exact(i)), (*c as f64, SegmentValue::Exact(i + 1))],
            color.filled(),
        );
        r.set_margin(4, 4, 0, 0);
        r
    }))?;
    Ok(())
}

fn draw_by_length(root: &Area<'_>, title: &str, buckets: &LengthBuckets) -> Result<()> {
    let n = buckets.totals.len();
    let names: Vec<String> = (0..n).map(|i| buckets.bucket_name(i)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, TITLE_FONT)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..1.15f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Text Length")
        .y_desc("Proportion")
        .label_style(LABEL_FONT)
        .x_label_formatter(&|v| segment_name(v, &names))
        .draw()?;

    let mut base = vec![0f64; n];
    for (li, label) in buckets.labels.iter().enumerate() {
        let color = label_color(*label);
        let mut bars = Vec::new();
        for b in 0..n {
            let p = buckets.proportions[b][li];
            if p > 0.0 {
                bars.push(bar(b, base[b], base[b] + p, color));
                base[b] += p;
            }
        }
        chart
            .draw_series(bars)?
            .label(label.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(LABEL_FONT)
        .draw()?;
    Ok(())
}

fn bar(i: usize, y0: f64, y1: f64, color: RGBColor) -> Rectangle<(SegmentValue<usize>, f64)> {
    let mut r = Rectangle::new(
        [(SegmentValue::Exact(i), y0), (SegmentValue::Exact(i + 1), y1)],
        color.filled(),
    );
    r.set_margin(0, 0, 20, 20);
    r
}

fn segment_name(v: &SegmentValue<usize>, names: &[String]) -> String {
    match v {
        SegmentValue::CenterOf(i) => names.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn truncate_label(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, remote: &str, local: &str, phrases: &[&str], scores: [f64; 4]) -> ResultRow {
        ResultRow {
            text: text.into(),
            remote_sentiment: Some(remote.into()),
            remote_positive: Some(scores[0]),
            remote_negative: Some(scores[1]),
            remote_neutral: Some(scores[2]),
            remote_mixed: Some(scores[3]),
            local_sentiment: Some(local.into()),
            key_phrases: Some(serde_json::to_string(phrases).unwrap()),
            entities: Some("[]".into()),
            word_count: Some(text.split_whitespace().count()),
            char_count: Some(text.chars().count()),
            error: None,
        }
    }

    fn sample() -> Vec<ResultRow> {
        vec![
            row("aaaaaaaaaa", "POSITIVE", "POSITIVE", &["coffee", "morning"], [0.9, 0.05, 0.04, 0.01]),
            row("bbbbbbbbbbbbbbbbbbbb", "NEGATIVE", "NEUTRAL", &["traffic"], [0.1, 0.8, 0.05, 0.05]),
            row("cccccccccccccccccccccccccccccc", "MIXED", "POSITIVE", &["coffee"], [0.3, 0.3, 0.1, 0.3]),
            row("dddddddddddddddddddddddddddddddddddddddd", "POSITIVE", "NEGATIVE", &["coffee", "traffic"], [0.7, 0.1, 0.1, 0.1]),
            row("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee", "NEUTRAL", "NEUTRAL", &[], [0.05, 0.05, 0.85, 0.05]),
        ]
    }

    fn refs(rows: &[ResultRow]) -> Vec<&ResultRow> {
        rows.iter().collect()
    }

    #[test]
    fn label_counts_most_frequent_first() {
        let rows = sample();
        let counts = label_counts(&refs(&rows));
        assert_eq!(counts[0], (SentimentLabel::Positive, 2));
        assert_eq!(counts.len(), 4);
        assert_eq!(counts.iter().map(|c| c.1).sum::<usize>(), 5);
    }

    #[test]
    fn crosstab_keeps_mixed_remote_only() {
        let rows = sample();
        let t = crosstab(&refs(&rows));
        assert_eq!(t.locals, vec![LocalLabel::Negative, LocalLabel::Neutral, LocalLabel::Positive]);
        assert_eq!(
            t.remotes,
            vec![SentimentLabel::Mixed, SentimentLabel::Negative, SentimentLabel::Neutral, SentimentLabel::Positive]
        );
        // local POSITIVE row: one remote POSITIVE, one remote MIXED
        assert_eq!(t.counts[2], vec![1, 0, 0, 1]);
        let total: usize = t.counts.iter().flatten().sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn top_phrases_ranked_with_stable_ties() {
        let rows = sample();
        let top = top_key_phrases(&refs(&rows), 20).unwrap();
        assert_eq!(
            top,
            vec![("coffee".to_string(), 3), ("traffic".to_string(), 2), ("morning".to_string(), 1)]
        );
        let top1 = top_key_phrases(&refs(&rows), 1).unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn top_phrases_fail_when_none() {
        let mut rows = sample();
        for r in rows.iter_mut() {
            r.key_phrases = Some("[]".into());
        }
        assert!(top_key_phrases(&refs(&rows), 20).is_err());
    }

    #[test]
    fn length_buckets_equal_width_right_closed() {
        let rows = sample();
        let b = length_buckets(&refs(&rows), 5).unwrap();
        assert_eq!(b.totals, vec![1, 1, 1, 1, 1]);
        assert!(b.edges[0] < 10.0);
        assert_eq!(b.edges[5], 50.0);
        assert!((b.edges[1] - 18.0).abs() < 1e-9);
        for (i, props) in b.proportions.iter().enumerate() {
            let s: f64 = props.iter().sum();
            assert!((s - 1.0).abs() < 1e-9, "bucket {i} sums to {s}");
        }
        assert_eq!(b.bucket_name(1), "(18.0, 26.0]");
    }

    #[test]
    fn length_buckets_degenerate_range() {
        let rows = vec![
            row("same", "POSITIVE", "POSITIVE", &[], [1.0, 0.0, 0.0, 0.0]),
            row("size", "NEGATIVE", "NEGATIVE", &[], [0.0, 1.0, 0.0, 0.0]),
        ];
        let b = length_buckets(&refs(&rows), 5).unwrap();
        assert_eq!(b.totals.iter().sum::<usize>(), 2);
        assert_eq!(b.totals[2], 2);
        assert_eq!(b.proportions[2], vec![0.5, 0.5]);
    }

    #[test]
    fn box_stats_quartiles_and_outliers() {
        let b = box_stats(&[0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();
        assert!((b.q1 - 0.2).abs() < 1e-9);
        assert!((b.median - 0.3).abs() < 1e-9);
        assert!((b.q3 - 0.4).abs() < 1e-9);
        assert!(b.outliers.is_empty());

        let b = box_stats(&[0.1, 0.11, 0.12, 0.13, 0.95]).unwrap();
        assert_eq!(b.outliers, vec![0.95]);
        assert!((b.whisker_hi - 0.13).abs() < 1e-9);
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn missing_key_phrases_only_drop_that_chart() {
        let mut rows = sample();
        rows.push(ResultRow { text: "bad".into(), error: Some("boom".into()), ..ResultRow::default() });
        for r in rows.iter_mut() {
            r.key_phrases = Some("[]".into());
        }
        let dir = tempfile::tempdir().unwrap();
        let report = write_all_charts(dir.path(), &rows, &ChartConfig::default()).unwrap();

        assert_eq!(report.written.len(), 4, "failed: {:?}", report.failed);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ChartKind::TopKeyPhrases);
        assert!(report.failed[0].1.contains("no key phrases"));
        for kind in ChartKind::ALL.iter().filter(|k| **k != ChartKind::TopKeyPhrases) {
            let path = dir.path().join(kind.file_name());
            assert!(path.exists(), "{} missing", kind.file_name());
            let png = std::fs::read(&path).unwrap();
            assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        }
        assert!(!dir.path().join("top_key_phrases.png").exists());
    }

    #[test]
    fn no_analyzed_rows_fails_every_chart_gracefully() {
        let rows = vec![ResultRow { text: "x".into(), error: Some("boom".into()), ..ResultRow::default() }];
        let (charts, failed) = render_inline(&rows, &ChartConfig::default());
        assert!(charts.is_empty());
        assert_eq!(failed.len(), 5);
    }
}
