use super::Backend;
use super::BackendError;
use super::TextBox;
use std::io::Write;
use std::process::Command;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Shells out to the `tesseract` binary and reads its TSV output.
///
/// Preprocessing (thresholding, deskew) is the OCR side's concern; this
/// adapter only moves bytes in and text boxes out.
pub struct TesseractCli {
    binary: String,
    /// Page segmentation mode; 6 assumes a uniform block of text, which
    /// fits a result-table screenshot.
    psm: u8,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            psm: 6,
        }
    }
}

impl TesseractCli {
    pub fn new(binary: String, psm: u8) -> Self {
        Self { binary, psm }
    }
}

static SCRATCH: AtomicU64 = AtomicU64::new(0);

impl Backend for TesseractCli {
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextBox>, BackendError> {
        let scratch = std::env::temp_dir().join(format!(
            "mkw-ocr-{}-{}.png",
            std::process::id(),
            SCRATCH.fetch_add(1, Ordering::Relaxed),
        ));
        let mut file = std::fs::File::create(&scratch)?;
        file.write_all(image)?;
        drop(file);
        let output = Command::new(&self.binary)
            .arg(&scratch)
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output();
        let _ = std::fs::remove_file(&scratch);
        let output = output?;
        if !output.status.success() {
            return Err(BackendError::Process(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv))
    }
}

/// Word-level rows of tesseract's TSV: `level == 5`, confidence >= 0.
fn parse_tsv(tsv: &str) -> Vec<TextBox> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols = line.split('\t').collect::<Vec<_>>();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let confidence = cols[10].parse::<f32>().ok()?;
            let text = cols[11].trim();
            if confidence < 0.0 || text.is_empty() {
                return None;
            }
            Some(TextBox::new(
                text.to_string(),
                (
                    cols[6].parse().ok()?,
                    cols[7].parse().ok()?,
                    cols[8].parse().ok()?,
                    cols[9].parse().ok()?,
                ),
                confidence,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn word_rows_become_boxes() {
        let tsv = format!(
            "{}\n5\t1\t1\t1\t1\t1\t10\t20\t60\t16\t91.5\tAlpha\n5\t1\t1\t1\t1\t2\t200\t20\t30\t16\t88.0\t95\n",
            HEADER
        );
        let boxes = parse_tsv(&tsv);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].text, "Alpha");
        assert_eq!(boxes[0].bounds, (10, 20, 60, 16));
        assert_eq!(boxes[1].text, "95");
    }

    #[test]
    fn structural_rows_and_noise_skipped() {
        let tsv = format!(
            "{}\n4\t1\t1\t1\t1\t0\t0\t0\t100\t30\t-1\t\n5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\t \n",
            HEADER
        );
        assert!(parse_tsv(&tsv).is_empty());
    }
}
