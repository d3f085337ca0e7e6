//! Estimator web form rendered from the field schema

use crate::features::FieldValue;
use crate::schema::{Derivation, FieldKind, FieldSchema, FieldSpec};
use std::fmt::Write;

/// Escape text for HTML bodies and attribute values
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn default_of(spec: &FieldSpec) -> Option<&FieldValue> {
    match &spec.source {
        Derivation::Input { default } => default.as_ref(),
        _ => None,
    }
}

fn render_field(html: &mut String, spec: &FieldSpec) {
    let name = escape(&spec.name);
    let label = escape(&spec.display_label());
    let default = default_of(spec).map(FieldValue::as_category);

    let _ = writeln!(html, r#"<label for="{name}">{label}</label>"#);

    match &spec.choices {
        Some(choices) if !choices.is_empty() => {
            let _ = writeln!(
                html,
                r#"<select id="{name}" name="{name}" data-kind="{kind}">"#,
                kind = kind_attr(spec.kind)
            );
            for choice in choices {
                let value = choice.as_category();
                let selected = if default.as_deref() == Some(value.as_str()) {
                    " selected"
                } else {
                    ""
                };
                let value = escape(&value);
                let _ = writeln!(html, r#"  <option value="{value}"{selected}>{value}</option>"#);
            }
            html.push_str("</select>\n");
        }
        _ if spec.kind == FieldKind::Numeric => {
            let mut attrs = String::new();
            if let Some(range) = spec.range {
                let _ = write!(attrs, r#" min="{}""#, range.min);
                if let Some(max) = range.max {
                    let _ = write!(attrs, r#" max="{}""#, max);
                }
                let _ = write!(attrs, r#" step="{}""#, range.step.unwrap_or(1.0));
            } else {
                attrs.push_str(r#" step="any""#);
            }
            let value = escape(default.as_deref().unwrap_or(""));
            let _ = writeln!(
                html,
                r#"<input type="number" id="{name}" name="{name}" data-kind="numeric" value="{value}"{attrs} required>"#
            );
        }
        _ => {
            let value = escape(default.as_deref().unwrap_or(""));
            let _ = writeln!(
                html,
                r#"<input type="text" id="{name}" name="{name}" data-kind="categorical" value="{value}" required>"#
            );
        }
    }
}

fn kind_attr(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Categorical => "categorical",
        FieldKind::Numeric => "numeric",
    }
}

/// Full index page: input form, result line and batch upload
pub fn render_index(schema: &FieldSchema, model_loaded: bool) -> String {
    let mut fields = String::new();
    for spec in schema.input_fields() {
        render_field(&mut fields, spec);
    }

    let notice = if model_loaded {
        ""
    } else {
        r#"<p class="warn">No trained model is loaded. Train one with <code>metro-cost train</code> and restart the server.</p>"#
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Metro Station Civil Cost Estimator</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; }}
form.grid {{ display: grid; grid-template-columns: 16rem 1fr; gap: .5rem 1rem; align-items: center; }}
button {{ margin-top: 1rem; padding: .5rem 1.25rem; }}
#result {{ font-size: 1.5rem; margin: 1rem 0; }}
.error {{ color: #b00020; }}
.warn {{ background: #fff4d6; padding: .75rem; }}
</style>
</head>
<body>
<h1>Metro Station Civil Cost Estimator</h1>
{notice}
<h2>Single station</h2>
<form id="estimate" class="grid">
{fields}<span></span><button type="submit">Estimate cost</button>
</form>
<div id="result"></div>
<h2>Batch upload</h2>
<p>CSV, JSON or Parquet with one row per station and a column for every field above.</p>
<form id="batch" method="post" action="/api/predict/batch?format=csv" enctype="multipart/form-data">
<input type="file" name="file" accept=".csv,.tsv,.json,.jsonl,.parquet" required>
<button type="submit">Score file</button>
</form>
<script>
document.getElementById('estimate').addEventListener('submit', async (ev) => {{
  ev.preventDefault();
  const body = {{}};
  for (const el of ev.target.elements) {{
    if (!el.name) continue;
    body[el.name] = el.dataset.kind === 'numeric' && el.value !== '' ? Number(el.value) : el.value;
  }}
  const out = document.getElementById('result');
  const res = await fetch('/api/predict', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify(body),
  }});
  const data = await res.json();
  out.className = res.ok ? '' : 'error';
  out.textContent = res.ok ? 'Estimated Civil Cost: ' + data.display : data.message;
}});
</script>
</body>
</html>
"#
    )
}
