// src/render.rs
use crate::charts::InlineChart;
use crate::results::ResultRow;

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:1100px;color:#222}\
table{border-collapse:collapse;font-size:13px;width:100%}\
th,td{border:1px solid #ccc;padding:4px 6px;text-align:left;vertical-align:top}\
th{background:#f3f3f3}.err{color:#b00020}\
img{max-width:100%;margin:1em 0;border:1px solid #eee}\
textarea{width:100%;height:6em}\
.cards{display:flex;flex-wrap:wrap;gap:1em;margin:1em 0}\
.card{flex:1 1 300px;border:1px solid #ddd;border-radius:6px;padding:0.5em 1em;background:#fafafa}";

/// Renders the `/analyze` JSON into result cards; values go through `textContent`.
const SINGLE_RESULT_SCRIPT: &str = r#"<script>
function row(table, key, value) {
  const tr = table.insertRow();
  const th = document.createElement('th');
  th.textContent = key;
  tr.appendChild(th);
  tr.insertCell().textContent = value;
}
function card(title, fill) {
  const div = document.createElement('div');
  div.className = 'card';
  const h = document.createElement('h3');
  h.textContent = title;
  const table = document.createElement('table');
  fill(table);
  div.append(h, table);
  return div;
}
function showResult(r) {
  const out = document.getElementById('result');
  out.replaceChildren();
  if (r.error) {
    const p = document.createElement('p');
    p.className = 'err';
    p.textContent = r.error;
    out.appendChild(p);
    return;
  }
  out.append(
    card('Sentiment', t => {
      row(t, 'Remote', r.remote_sentiment_label);
      row(t, 'Local', r.local_sentiment_label);
    }),
    card('Remote scores', t => {
      for (const k of ['positive', 'negative', 'neutral', 'mixed']) row(t, k, r.remote_scores[k].toFixed(3));
    }),
    card('Key phrases', t => {
      if (r.key_phrases.length === 0) row(t, '-', 'none');
      r.key_phrases.forEach((p, i) => row(t, String(i + 1), p));
    }),
    card('Entities', t => {
      if (r.entities.length === 0) row(t, '-', 'none');
      r.entities.forEach(e => row(t, e.type, e.text));
    }),
    card('Text statistics', t => {
      row(t, 'Words', r.word_count);
      row(t, 'Characters', r.char_count);
    }),
  );
}
document.getElementById('single').addEventListener('submit', async (e) => {
  e.preventDefault();
  const res = await fetch('/analyze', {method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify({text: e.target.text.value})});
  showResult(await res.json());
});
</script>
"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

/// Dashboard: single-text form (posts JSON to /analyze) and CSV upload form.
pub fn render_index(default_column: &str) -> String {
    let mut b = String::new();
    b.push_str("<h1>SentiTweet</h1>\n");

    b.push_str("<h2>Analyze a tweet</h2>\n");
    b.push_str("<form id=\"single\">\n<textarea name=\"text\" placeholder=\"Type or paste a tweet\"></textarea>\n");
    b.push_str("<button type=\"submit\">Analyze</button>\n</form>\n<div id=\"result\" class=\"cards\"></div>\n");
    b.push_str(SINGLE_RESULT_SCRIPT);

    b.push_str("<h2>Analyze a CSV file</h2>\n");
    b.push_str("<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n");
    b.push_str("<p><input type=\"file\" name=\"file\" accept=\".csv\" required></p>\n");
    b.push_str(&format!(
        "<p><label>Text column <input name=\"text_column\" value=\"{}\"></label>\n",
        escape_html(default_column)
    ));
    b.push_str("<label>Start row <input name=\"start_row\" type=\"number\" min=\"0\"></label>\n");
    b.push_str("<label>End row <input name=\"end_row\" type=\"number\" min=\"0\"></label></p>\n");
    b.push_str("<button type=\"submit\">Upload</button>\n</form>\n");

    page("SentiTweet", &b)
}

/// Results view: inline charts, then the result table.
pub fn render_results(file_name: &str, rows: &[ResultRow], charts: &[InlineChart], chart_errors: &[String]) -> String {
    let failed = rows.iter().filter(|r| r.is_error()).count();
    let mut b = String::new();
    b.push_str(&format!("<h1>Results for {}</h1>\n", escape_html(file_name)));
    b.push_str(&format!(
        "<p>{} rows analyzed, {} failed. <a href=\"/\">Analyze another file</a></p>\n",
        rows.len() - failed,
        failed
    ));

    for c in charts {
        let id = c.kind.file_name().trim_end_matches(".png");
        b.push_str(&format!("<figure id=\"{}\">\n<h2>{}</h2>\n", id, escape_html(&c.title)));
        b.push_str(&format!(
            "<img src=\"data:image/png;base64,{}\" alt=\"{}\">\n</figure>\n",
            c.png_base64,
            escape_html(&c.title)
        ));
    }
    if !chart_errors.is_empty() {
        b.push_str("<ul class=\"err\">\n");
        for e in chart_errors {
            b.push_str(&format!("<li>{}</li>\n", escape_html(e)));
        }
        b.push_str("</ul>\n");
    }

    b.push_str("<h2>Data</h2>\n<table>\n<tr>");
    for h in [
        "text",
        "remote_sentiment",
        "positive",
        "negative",
        "neutral",
        "mixed",
        "local_sentiment",
        "key_phrases",
        "entities",
        "words",
        "chars",
        "error",
    ] {
        b.push_str(&format!("<th>{}</th>", h));
    }
    b.push_str("</tr>\n");

    for r in rows {
        let score = |v: Option<f64>| v.map(|x| format!("{:.3}", x)).unwrap_or_default();
        let entities = r
            .entity_list()
            .iter()
            .map(|e| format!("{} ({})", e.text, e.kind))
            .collect::<Vec<_>>()
            .join(", ");
        let cells = [
            r.text.clone(),
            r.remote_sentiment.clone().unwrap_or_default(),
            score(r.remote_positive),
            score(r.remote_negative),
            score(r.remote_neutral),
            score(r.remote_mixed),
            r.local_sentiment.clone().unwrap_or_default(),
            r.key_phrase_list().join(", "),
            entities,
            r.word_count.map(|n| n.to_string()).unwrap_or_default(),
            r.char_count.map(|n| n.to_string()).unwrap_or_default(),
            r.error.clone().unwrap_or_default(),
        ];
        b.push_str(if r.is_error() { "<tr class=\"err\">" } else { "<tr>" });
        for c in cells {
            b.push_str(&format!("<td>{}</td>", escape_html(&c)));
        }
        b.push_str("</tr>\n");
    }
    b.push_str("</table>\n");

    page("SentiTweet results", &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"hi\" & 'bye'</b>"), "&lt;b&gt;&quot;hi&quot; &amp; &#39;bye&#39;&lt;/b&gt;");
    }

    #[test]
    fn index_has_both_forms() {
        let html = render_index("tweet\"x");
        assert!(html.contains("action=\"/\""));
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("fetch('/analyze'"));
        assert!(html.contains("id=\"result\" class=\"cards\""));
        for title in ["'Sentiment'", "'Key phrases'", "'Entities'", "'Text statistics'"] {
            assert!(html.contains(title), "missing card {title}");
        }
        assert!(!html.contains("innerHTML"));
        assert!(html.contains("value=\"tweet&quot;x\""));
    }

    #[test]
    fn results_page_escapes_rows_and_embeds_charts() {
        let rows = vec![
            ResultRow {
                text: "<script>alert(1)</script>".into(),
                remote_sentiment: Some("POSITIVE".into()),
                remote_positive: Some(0.9),
                key_phrases: Some("[\"a & b\"]".into()),
                ..ResultRow::default()
            },
            ResultRow { text: "bad".into(), error: Some("boom".into()), ..ResultRow::default() },
        ];
        let charts = vec![InlineChart {
            kind: crate::charts::ChartKind::Distribution,
            title: "Remote Sentiment Distribution".into(),
            png_base64: "QUJD".into(),
        }];
        let html = render_results("t.csv", &rows, &charts, &["top_key_phrases.png: no key phrases".into()]);

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("data:image/png;base64,QUJD"));
        assert!(html.contains("<figure id=\"sentiment_distribution\">"));
        assert!(html.contains("1 rows analyzed, 1 failed"));
        assert!(html.contains("<td>0.900</td>"));
        assert!(html.contains("no key phrases"));
    }
}
