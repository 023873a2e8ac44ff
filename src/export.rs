//! Export a candidate as a self-contained runnable bundle.
//!
//! The bundle is a single HTML document: one `<script src>` per selected
//! addon locator, in selection order, followed by the candidate's source
//! inline. The source is embedded verbatim apart from escaping `</script>`
//! so the document cannot be cut short.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::addons::LibraryAddon;
use crate::candidate::Candidate;

/// Render the bundle document for one candidate and addon selection.
pub fn render_bundle(candidate: &Candidate, addons: &[LibraryAddon]) -> String {
    let mut scripts = String::new();
    for addon in addons {
        scripts.push_str(&format!(
            "    <script src=\"{}\"></script>\n",
            addon.resource_locator
        ));
    }

    let source = candidate.source_code().replace("</script", "<\\/script");

    format!(
        "<!doctype html>\n<html>\n  <head>\n    <meta charset=\"utf-8\" />\n    <title>easel sketch {id}</title>\n{scripts}    <style>\n      html, body {{ margin: 0; padding: 0; }}\n    </style>\n  </head>\n  <body>\n    <script>\n{source}\n    </script>\n  </body>\n</html>\n",
        id = candidate.id,
        scripts = scripts,
        source = source,
    )
}

/// Write the bundle next to wherever the caller points and return its path.
pub fn write_bundle(
    candidate: &Candidate,
    addons: &[LibraryAddon],
    out: &Path,
) -> Result<PathBuf> {
    let document = render_bundle(candidate, addons);
    std::fs::write(out, document)
        .with_context(|| format!("Failed to write bundle to {}", out.display()))?;
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateId;

    fn candidate(source: &str) -> Candidate {
        Candidate::new(CandidateId(9), "raw", source)
    }

    #[test]
    fn bundle_embeds_source_verbatim() {
        let source = "function setup() {\n  createCanvas(600, 600);\n}";
        let html = render_bundle(&candidate(source), &[]);
        assert!(html.contains(source));
        assert!(html.contains("easel sketch candidate-9"));
    }

    #[test]
    fn bundle_references_addons_in_selection_order() {
        let addons = vec![
            LibraryAddon::new("tone", "Tone.js", "https://cdn.example/tone.js"),
            LibraryAddon::new("ml5", "ml5.js", "https://cdn.example/ml5.js"),
        ];
        let html = render_bundle(&candidate("circle(1, 2, 3);"), &addons);
        let tone = html.find("https://cdn.example/tone.js").unwrap();
        let ml5 = html.find("https://cdn.example/ml5.js").unwrap();
        assert!(tone < ml5);
        // Addon scripts load before the inline sketch.
        let inline = html.find("<script>\n").unwrap();
        assert!(ml5 < inline);
    }

    #[test]
    fn closing_script_tags_are_escaped() {
        let html = render_bundle(&candidate("let s = '</script>';"), &[]);
        assert!(html.contains("<\\/script>"));
        // The document still has exactly one real closing tag for the
        // inline script.
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn write_bundle_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sketch.html");
        let path = write_bundle(&candidate("circle(1, 2, 3);"), &[], &out).unwrap();
        assert_eq!(path, out);
        let written = std::fs::read_to_string(out).unwrap();
        assert!(written.contains("circle(1, 2, 3);"));
    }

    #[test]
    fn exported_source_survives_a_fence_round_trip() {
        let source = "function setup() {\n  createCanvas(600, 600);\n}";
        let html = render_bundle(&candidate(source), &[]);
        assert!(html.contains(source));

        let fenced = format!("```js\n{}\n```", source);
        assert_eq!(crate::extract::extract_code(&fenced), source);
    }
}
