//! Output writing
//!
//! Writes rendered datasets to a file or stdout.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zero_log_decoder::{OutputFormat, Rendered};

/// Where rendered output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// Resolve the destination: an explicit path (`-` for stdout) or the
    /// input path with the format's extension
    pub fn resolve(explicit: Option<&Path>, input: &Path, format: OutputFormat) -> Self {
        match explicit {
            Some(path) if path == Path::new("-") => Destination::Stdout,
            Some(path) => Destination::File(path.to_path_buf()),
            None => Destination::File(input.with_extension(format.extension())),
        }
    }
}

/// Write `rendered` to `destination`
pub fn write_rendered(rendered: &Rendered, destination: &Destination) -> Result<()> {
    match destination {
        Destination::Stdout => {
            let stdout = io::stdout();
            write_to(rendered, &mut stdout.lock()).context("Failed to write to stdout")
        }
        Destination::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut writer = BufWriter::new(file);
            write_to(rendered, &mut writer)
                .and_then(|_| writer.flush().map_err(Into::into))
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            log::info!("Wrote {:?}", path);
            Ok(())
        }
    }
}

fn write_to<W: Write>(rendered: &Rendered, writer: &mut W) -> Result<()> {
    match rendered {
        Rendered::Lines(lines) => {
            for line in lines {
                writeln!(writer, "{}", line)?;
            }
        }
        Rendered::Json(value) => {
            serde_json::to_writer_pretty(&mut *writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_resolution() {
        let input = Path::new("logs/538SD9Z37GCG06073_MBB_2018-05-21.txt");
        assert_eq!(
            Destination::resolve(None, input, OutputFormat::Tsv),
            Destination::File(PathBuf::from("logs/538SD9Z37GCG06073_MBB_2018-05-21.tsv"))
        );
        assert_eq!(
            Destination::resolve(Some(Path::new("-")), input, OutputFormat::Csv),
            Destination::Stdout
        );
        assert_eq!(
            Destination::resolve(Some(Path::new("out.json")), input, OutputFormat::Json),
            Destination::File(PathBuf::from("out.json"))
        );
    }

    #[test]
    fn test_write_lines_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("out.csv");
        let rendered = Rendered::Lines(vec!["entry,event".to_string(), "1,Disarmed".to_string()]);
        write_rendered(&rendered, &Destination::File(path.clone())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "entry,event\n1,Disarmed\n");

        let path = dir.path().join("out.json");
        let rendered = Rendered::Json(serde_json::json!({"entries": []}));
        write_rendered(&rendered, &Destination::File(path.clone())).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["entries"], serde_json::json!([]));
    }
}
