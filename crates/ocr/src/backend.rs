/// One recognized text region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub text: String,
    /// Pixel bounds: left, top, width, height.
    pub bounds: (i32, i32, i32, i32),
    /// Recognition confidence in 0..=100.
    pub confidence: f32,
}

impl TextBox {
    pub fn new(text: String, bounds: (i32, i32, i32, i32), confidence: f32) -> Self {
        Self {
            text,
            bounds,
            confidence,
        }
    }
}

/// Status tag attached to every engine result.
///
/// The engine never retries; empty and error outputs are returned
/// verbatim and the caller decides whether they become failure rows.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrStatus {
    Ok,
    Empty,
    Error(String),
}

/// Completed OCR submission: the raw boxes plus a status tag.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub boxes: Vec<TextBox>,
    pub status: OcrStatus,
}

impl OcrOutput {
    pub fn from_boxes(boxes: Vec<TextBox>) -> Self {
        let status = match boxes.is_empty() {
            true => OcrStatus::Empty,
            false => OcrStatus::Ok,
        };
        Self { boxes, status }
    }
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            boxes: Vec::new(),
            status: OcrStatus::Error(message.into()),
        }
    }
    pub fn ok(&self) -> bool {
        matches!(self.status, OcrStatus::Ok)
    }
}

/// Failure raised by a concrete OCR implementation.
#[derive(Debug)]
pub enum BackendError {
    Io(std::io::Error),
    Process(String),
    Malformed(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "ocr io error: {}", e),
            Self::Process(s) => write!(f, "ocr process failed: {}", s),
            Self::Malformed(s) => write!(f, "unreadable ocr output: {}", s),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// The pluggable OCR function: `bytes → [(text, box, confidence)]`.
///
/// Implementations are CPU-bound and synchronous; the engine runs them on
/// the blocking thread pool under a tier permit.
pub trait Backend: Send + Sync + 'static {
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextBox>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_boxes_tag_empty() {
        assert_eq!(OcrOutput::from_boxes(vec![]).status, OcrStatus::Empty);
    }

    #[test]
    fn nonempty_boxes_tag_ok() {
        let boxes = vec![TextBox::new("Alpha".to_string(), (0, 0, 10, 10), 90.0)];
        assert!(OcrOutput::from_boxes(boxes).ok());
    }
}
