//! Composition of the isolated execution document.
//!
//! The document is a single self-contained JavaScript program: a status
//! reporter and error trap, a minimal drawing shim, the selected addon
//! sources in selection order, the candidate's (possibly wrapped) program
//! text, and a driver that evaluates the sketch's entry points. It is the
//! only thing handed to the sandbox runtime; everything the host learns
//! about the run comes back as status lines on stdout.

use std::sync::LazyLock;

use regex::Regex;

use crate::candidate::CandidateId;

/// Side length of the synthesized default canvas.
pub const DEFAULT_CANVAS_SIZE: u32 = 600;

static ENTRY_POINT: LazyLock<Regex> = LazyLock::new(|| {
    // Declarations and assignments both count as entry points:
    //   function setup() {}    setup = () => {}    let draw = function () {}
    Regex::new(r"(?m)\bfunction\s+(setup|draw)\s*\(|\b(setup|draw)\s*=\s*(async\s+)?(function\b|\()")
        .unwrap_or_else(|e| panic!("entry point regex is invalid: {}", e))
});

/// Whether the program declares a recognizable setup/draw-style entry point.
pub fn has_entry_point(source: &str) -> bool {
    ENTRY_POINT.is_match(source)
}

/// Wrap bare statements inside a synthesized default entry point.
///
/// Best-effort only: the wrap is a textual transform and deliberately does
/// not try to repair a malformed program: a wrapped sketch that still
/// fails to evaluate surfaces as a normal `error` status.
pub fn wrap_source(source: &str) -> String {
    let indented: String = source
        .lines()
        .map(|line| format!("  {}\n", line))
        .collect();
    format!(
        "function setup() {{\n  createCanvas({size}, {size});\n{body}}}\n",
        size = DEFAULT_CANVAS_SIZE,
        body = indented,
    )
}

/// Everything needed to compose one candidate's execution document.
pub struct DocumentSpec<'a> {
    pub candidate_id: CandidateId,
    /// Program text, already wrapped if it lacked an entry point.
    pub source: &'a str,
    /// `(addon id, addon source)` pairs in selection order.
    pub addons: &'a [(String, String)],
    pub settle_ms: u64,
    pub frame_budget: u32,
}

/// Minimal p5-style surface. Records operations instead of rasterizing, and
/// provides the math helpers generated sketches lean on.
const RUNTIME_SHIM: &str = r#"let frameCount = 0;
let width = 0;
let height = 0;
let __looping = true;
const __ops = [];
function __op(name, args) { __ops.push([name, args]); }
function createCanvas(w, h) { width = w; height = h; __op('createCanvas', [w, h]); }
function background() { __op('background', Array.from(arguments)); }
function fill() { __op('fill', Array.from(arguments)); }
function noFill() { __op('noFill', []); }
function stroke() { __op('stroke', Array.from(arguments)); }
function noStroke() { __op('noStroke', []); }
function strokeWeight(w) { __op('strokeWeight', [w]); }
function colorMode() { __op('colorMode', Array.from(arguments)); }
function rect(x, y, w, h) { __op('rect', [x, y, w, h]); }
function ellipse(x, y, w, h) { __op('ellipse', [x, y, w, h]); }
function circle(x, y, d) { __op('circle', [x, y, d]); }
function line(x1, y1, x2, y2) { __op('line', [x1, y1, x2, y2]); }
function point(x, y) { __op('point', [x, y]); }
function triangle(a, b, c, d, e, f) { __op('triangle', [a, b, c, d, e, f]); }
function text(str, x, y) { __op('text', [String(str), x, y]); }
function textSize(s) { __op('textSize', [s]); }
function push() { __op('push', []); }
function pop() { __op('pop', []); }
function translate(x, y) { __op('translate', [x, y]); }
function rotate(a) { __op('rotate', [a]); }
function scale(s) { __op('scale', [s]); }
function noLoop() { __looping = false; }
function loop() { __looping = true; }
function random(min, max) {
  if (min === undefined) { return Math.random(); }
  if (Array.isArray(min)) { return min[Math.floor(Math.random() * min.length)]; }
  if (max === undefined) { return Math.random() * min; }
  return min + Math.random() * (max - min);
}
function map(v, a, b, c, d) { return c + ((v - a) / (b - a)) * (d - c); }
function constrain(v, lo, hi) { return Math.min(Math.max(v, lo), hi); }
function dist(x1, y1, x2, y2) { return Math.hypot(x2 - x1, y2 - y1); }
function sin(a) { return Math.sin(a); }
function cos(a) { return Math.cos(a); }
const PI = Math.PI;
const TWO_PI = Math.PI * 2;
"#;

/// Compose the full execution document for one candidate.
pub fn compose_document(spec: &DocumentSpec<'_>) -> String {
    let mut doc = String::new();

    doc.push_str("'use strict';\n");
    doc.push_str(&format!(
        r#"const __candidateId = {id};
let __reported = false;
function __report(status, message) {{
  if (__reported) {{ return; }}
  __reported = true;
  const payload = {{ kind: 'status', candidateId: __candidateId, status: status }};
  if (message !== undefined) {{ payload.message = String(message); }}
  process.stdout.write(JSON.stringify(payload) + '\n');
}}
process.on('uncaughtException', function (err) {{
  __report('error', (err && err.message) || err);
  process.exitCode = 0;
}});
process.on('unhandledRejection', function (reason) {{
  __report('error', (reason && reason.message) || reason);
  process.exitCode = 0;
}});
"#,
        id = spec.candidate_id.0,
    ));

    doc.push_str("// ---- runtime shim ----\n");
    doc.push_str(RUNTIME_SHIM);

    for (id, source) in spec.addons {
        doc.push_str(&format!("// ---- addon: {} ----\n", id));
        doc.push_str(source);
        if !source.ends_with('\n') {
            doc.push('\n');
        }
    }

    doc.push_str("// ---- sketch ----\n");
    doc.push_str(spec.source);
    if !spec.source.ends_with('\n') {
        doc.push('\n');
    }

    doc.push_str(&format!(
        r#"// ---- driver ----
try {{
  if (typeof setup === 'function') {{ setup(); }}
  for (let __i = 0; __i < {frames} && __looping; __i++) {{
    frameCount += 1;
    if (typeof draw === 'function') {{ draw(); }} else {{ break; }}
  }}
  setTimeout(function () {{ __report('success'); }}, {settle});
}} catch (err) {{
  __report('error', (err && err.message) || err);
}}
"#,
        frames = spec.frame_budget,
        settle = spec.settle_ms,
    ));

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec<'a>(source: &'a str, addons: &'a [(String, String)]) -> DocumentSpec<'a> {
        DocumentSpec {
            candidate_id: CandidateId(7),
            source,
            addons,
            settle_ms: 600,
            frame_budget: 60,
        }
    }

    #[test]
    fn detects_function_declaration_entry_points() {
        assert!(has_entry_point("function setup() {}"));
        assert!(has_entry_point("function draw () { background(0); }"));
        assert!(has_entry_point("function  setup(){}"));
    }

    #[test]
    fn detects_assignment_entry_points() {
        assert!(has_entry_point("setup = () => { createCanvas(1, 1); }"));
        assert!(has_entry_point("let draw = function () {};"));
        assert!(has_entry_point("draw = async function () {};"));
    }

    #[test]
    fn bare_statements_have_no_entry_point() {
        assert!(!has_entry_point("circle(10, 10, 20);"));
        assert!(!has_entry_point("let setupDone = true;"));
        assert!(!has_entry_point(""));
    }

    #[test]
    fn wrap_synthesizes_default_setup() {
        let wrapped = wrap_source("circle(10, 10, 20);");
        assert!(wrapped.starts_with("function setup() {"));
        assert!(wrapped.contains("createCanvas(600, 600);"));
        assert!(wrapped.contains("  circle(10, 10, 20);"));
        assert!(has_entry_point(&wrapped));
    }

    #[test]
    fn document_embeds_candidate_id() {
        let doc = compose_document(&spec("function setup() {}", &[]));
        assert!(doc.contains("const __candidateId = 7;"));
    }

    #[test]
    fn document_sections_are_ordered() {
        let addons = vec![("tone".to_string(), "const Tone = {};".to_string())];
        let doc = compose_document(&spec("function setup() {}", &addons));

        let shim = doc.find("// ---- runtime shim ----").unwrap();
        let addon = doc.find("// ---- addon: tone ----").unwrap();
        let sketch = doc.find("// ---- sketch ----").unwrap();
        let driver = doc.find("// ---- driver ----").unwrap();
        assert!(shim < addon && addon < sketch && sketch < driver);
    }

    #[test]
    fn addons_are_injected_in_selection_order() {
        let addons = vec![
            ("tone".to_string(), "const Tone = {};".to_string()),
            ("ml5".to_string(), "const ml5 = {};".to_string()),
        ];
        let doc = compose_document(&spec("function setup() {}", &addons));
        let tone = doc.find("// ---- addon: tone ----").unwrap();
        let ml5 = doc.find("// ---- addon: ml5 ----").unwrap();
        assert!(tone < ml5);
    }

    #[test]
    fn document_carries_settle_delay_and_frame_budget() {
        let doc = compose_document(&DocumentSpec {
            candidate_id: CandidateId(1),
            source: "function setup() {}",
            addons: &[],
            settle_ms: 250,
            frame_budget: 12,
        });
        assert!(doc.contains(", 250);"));
        assert!(doc.contains("__i < 12"));
    }

    #[test]
    fn document_traps_async_errors() {
        let doc = compose_document(&spec("function setup() {}", &[]));
        assert!(doc.contains("uncaughtException"));
        assert!(doc.contains("unhandledRejection"));
    }

    #[test]
    fn shim_precedes_addons_so_addons_can_use_it() {
        let addons = vec![("helper".to_string(), "circle(0, 0, 1);".to_string())];
        let doc = compose_document(&spec("function setup() {}", &addons));
        let shim = doc.find("function circle(").unwrap();
        let addon = doc.find("// ---- addon: helper ----").unwrap();
        assert!(shim < addon);
    }
}
