//! Topic label layout.

/// Cuts a label to `max_chars` characters, marking the cut with "...".
pub fn truncate(label: &str, max_chars: usize) -> String {
	match label.char_indices().nth(max_chars) {
		Some((end, _)) => format!("{}...", &label[..end]),
		None => label.to_string(),
	}
}

/// Greedy word wrap. A line is closed as soon as the next word would push it
/// past `max_width`; a single word wider than `max_width` gets a line of its own.
/// Explicit line breaks in the label are kept.
pub fn wrap<F>(text: &str, max_width: f64, mut measure: F) -> Vec<String>
where
	F: FnMut(&str) -> f64,
{
	let mut lines = Vec::new();
	for paragraph in text.split('\n') {
		let mut line = String::new();
		for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
			if line.is_empty() {
				line.push_str(word);
				continue;
			}
			let candidate = format!("{line} {word}");
			if measure(&candidate) > max_width {
				lines.push(std::mem::take(&mut line));
				line.push_str(word);
			} else {
				line = candidate;
			}
		}
		lines.push(line);
	}
	lines
}
