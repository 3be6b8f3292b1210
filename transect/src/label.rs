//! Profile labels: `A-B`, `C-D`, … `Y-Z`, `AA-AB`, … `ZY-ZZ`, `AAA-AAB`, …
//!
//! Each label names the two ends of a line by consecutive letter
//! codes. Codes count in bijective base 26, so every width is used
//! up before the next one starts.

/// Returns the label of the `n`th profile (zero based).
pub fn label(n: usize) -> String {
    format!("{}-{}", code(2 * n), code(2 * n + 1))
}

/// Returns the bijective base-26 letter code of `k` (`0 -> A`,
/// `25 -> Z`, `26 -> AA`).
fn code(k: usize) -> String {
    let mut letters = Vec::new();
    let mut k = k + 1;
    while k > 0 {
        k -= 1;
        #[allow(clippy::cast_possible_truncation)]
        letters.push(b'A' + (k % 26) as u8);
        k /= 26;
    }
    letters.iter().rev().map(|&b| char::from(b)).collect()
}

/// Hands out labels in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Labeler {
    next: usize,
}

impl Labeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_label(&mut self) -> String {
        let label = label(self.next);
        self.next += 1;
        label
    }

    /// Number of labels handed out so far.
    pub fn issued(&self) -> usize {
        self.next
    }
}
