//! Rebuild reading-order lines from unordered OCR word boxes.
//!
//! Clustering is greedy and depends on input order: a word joins the first
//! line whose anchor lies within the threshold, even when a later line would
//! be closer. Lines come back in creation order, not sorted by height.

/// Default vertical distance, in device units, for two words to share a line.
pub const DEFAULT_LINE_Y_THRESHOLD: f64 = 10.0;

/// One polygon corner reported by the OCR provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate, growing downwards.
    pub y: f64,
}

impl Vertex {
    /// Construct a vertex.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One OCR annotation: detected text plus its bounding polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    /// Detected text.
    pub text: String,
    /// Bounding polygon in provider order.
    pub vertices: Vec<Vertex>,
}

impl WordBox {
    /// Construct a word box.
    pub fn new(text: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            text: text.into(),
            vertices,
        }
    }

    fn centroid(&self) -> Option<(f64, f64)> {
        if self.vertices.is_empty() {
            return None;
        }
        #[expect(
            clippy::cast_precision_loss,
            reason = "polygon vertex counts are tiny"
        )]
        let count = self.vertices.len() as f64;
        let (sum_x, sum_y) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(x, y), vertex| (x + vertex.x, y + vertex.y));
        Some((sum_x / count, sum_y / count))
    }
}

struct PlacedWord<'a> {
    text: &'a str,
    avg_x: f64,
}

struct TextLine<'a> {
    anchor_y: f64,
    words: Vec<PlacedWord<'a>>,
}

impl TextLine<'_> {
    fn render(mut self) -> String {
        self.words.sort_by(|a, b| a.avg_x.total_cmp(&b.avg_x));
        self.words
            .iter()
            .map(|word| word.text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Groups word boxes into lines by vertical proximity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineReconstructor {
    y_threshold: f64,
}

impl Default for LineReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_Y_THRESHOLD)
    }
}

impl LineReconstructor {
    /// Construct a reconstructor with an inclusive vertical threshold.
    pub const fn new(y_threshold: f64) -> Self {
        Self { y_threshold }
    }

    /// Vertical threshold in use.
    pub const fn y_threshold(&self) -> f64 {
        self.y_threshold
    }

    /// Reconstruct lines from provider annotations.
    ///
    /// The first annotation is the provider's full-text summary and is
    /// skipped. Words without vertices are ignored.
    ///
    /// # Examples
    /// ```
    /// use civet_backend::domain::{LineReconstructor, Vertex, WordBox};
    ///
    /// let boxes = vec![
    ///     WordBox::new("Coffee $3.50", vec![]),
    ///     WordBox::new("$3.50", vec![Vertex::new(80.0, 102.0)]),
    ///     WordBox::new("Coffee", vec![Vertex::new(10.0, 100.0)]),
    /// ];
    /// let lines = LineReconstructor::default().reconstruct(&boxes);
    /// assert_eq!(lines, vec!["Coffee $3.50".to_owned()]);
    /// ```
    pub fn reconstruct(&self, annotations: &[WordBox]) -> Vec<String> {
        let Some((_, words)) = annotations.split_first() else {
            return Vec::new();
        };

        let mut lines: Vec<TextLine<'_>> = Vec::new();
        for word in words {
            let Some((avg_x, avg_y)) = word.centroid() else {
                continue;
            };
            let placed = PlacedWord {
                text: word.text.as_str(),
                avg_x,
            };
            match lines
                .iter_mut()
                .find(|line| (line.anchor_y - avg_y).abs() <= self.y_threshold)
            {
                Some(line) => line.words.push(placed),
                None => lines.push(TextLine {
                    anchor_y: avg_y,
                    words: vec![placed],
                }),
            }
        }

        lines.into_iter().map(TextLine::render).collect()
    }
}
