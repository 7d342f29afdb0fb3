//! The per-strip batch driver.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ecow::{EcoString, EcoVec};
use qwantz::diag::Diagnostic;
use qwantz::image::Bitmap;
use qwantz::kit::Kit;
use qwantz::{Page, ParseOptions};
use rayon::prelude::*;
use walkdir::WalkDir;

/// The transcription of one input file, or why there is none.
pub struct Outcome {
    pub path: PathBuf,
    pub result: Result<EcoString, EcoString>,
    pub diagnostics: EcoVec<Diagnostic>,
}

/// Expand the input paths: directories yield their image files.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
            {
                if entry.file_type().is_file() && is_image(entry.path()) {
                    paths.push(entry.into_path());
                }
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

fn is_image(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("png" | "PNG"))
}

/// Transcribe every input. Pages are independent, so they run on the
/// thread pool; the outcomes come back in input order.
pub fn transcribe_all(paths: Vec<PathBuf>, kit: &Kit, options: ParseOptions) -> Vec<Outcome> {
    paths
        .into_par_iter()
        .map(|path| transcribe_one(path, kit, options))
        .collect()
}

fn transcribe_one(path: PathBuf, kit: &Kit, options: ParseOptions) -> Outcome {
    let mut sink = qwantz::diag::Sink::new();
    let result = (|| {
        let data = fs::read(&path).map_err(|err| EcoString::from(err.to_string()))?;
        let bitmap =
            Bitmap::decode(&data).map_err(|err| EcoString::from(err.to_string()))?;
        let page = qwantz::parse_page(&bitmap, kit, options, &mut sink)
            .map_err(|err| EcoString::from(err.to_string()))?;
        Ok(render(&page))
    })();
    Outcome { path, result, diagnostics: sink.take() }
}

/// Render a page as the transcript text format.
fn render(page: &Page) -> EcoString {
    let mut text = EcoString::new();
    for (index, panel) in page.panels.iter().enumerate() {
        let _ = writeln!(text, "Panel {}:", index + 1);
        for line in panel {
            let _ = writeln!(text, "{line}");
        }
        if index + 1 != page.panels.len() {
            text.push('\n');
        }
    }
    if !page.footer.is_empty() {
        text.push('\n');
        let _ = writeln!(text, "Footer:");
        for line in &page.footer {
            let _ = writeln!(text, "{line}");
        }
    }
    text
}

/// Write a transcript next to its source name in the output directory.
pub fn write_output(dir: &Path, source: &Path, text: &str) -> io::Result<PathBuf> {
    let stem = source.file_stem().unwrap_or(source.as_os_str());
    let mut target = dir.join(stem);
    target.set_extension("txt");
    fs::write(&target, text)?;
    Ok(target)
}
