/// Characters reserved per chunk for a synthetic closing fence, so a flushed
/// chunk stays within the transport limit even after the fence is appended.
const FENCE_RESERVE: usize = 4;

/// Split a long response into transport-sized chunks without corrupting
/// fenced code blocks: an open fence is closed at the end of a flushed chunk
/// and reopened at the head of the next one, so every chunk renders on its
/// own. A single line longer than the limit is hard-split mid-line rather
/// than dropped.
pub fn split_text(text: &str, max_length: usize) -> Vec<String> {
    let budget = max_length.saturating_sub(FENCE_RESERVE).max(8);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut code_block_open = false;

    for line in text.lines() {
        let line_chars = line.chars().count();
        let current_chars = current.chars().count();

        if current_chars + line_chars + 1 > budget {
            if line_chars + 1 <= budget {
                push_chunk(&mut chunks, &mut current, code_block_open);
            }
            // A reopened fence seeds the next chunk with a prefix, so the
            // line that forced the flush may still not fit on its own.
            if current.chars().count() + line_chars + 1 > budget {
                let mut remaining = line;
                while !remaining.is_empty() {
                    let used = current.chars().count();
                    let space_left = budget.saturating_sub(used + 1);
                    if space_left == 0 {
                        push_chunk(&mut chunks, &mut current, code_block_open);
                        continue;
                    }
                    let split_at = byte_index_of_char(remaining, space_left);
                    let (segment, rest) = remaining.split_at(split_at);
                    current.push_str(segment);
                    remaining = rest;
                    if !remaining.is_empty() {
                        push_chunk(&mut chunks, &mut current, code_block_open);
                    }
                }
                current.push('\n');
            } else {
                current.push_str(line);
                current.push('\n');
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }

        // Toggle after accumulation: a closing fence line that overflowed has
        // already been flushed out of the chunk it closes.
        if line.trim().starts_with("```") {
            code_block_open = !code_block_open;
        }
    }

    if !current.trim().is_empty() {
        if code_block_open {
            current.push_str("```");
        }
        chunks.push(current.trim().to_string());
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, current: &mut String, code_block_open: bool) {
    if code_block_open {
        current.push_str("```\n");
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        current.clear();
        current.push_str("```\n");
    } else {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        current.clear();
    }
}

/// Byte offset of the nth character, clamped to the string's end.
fn byte_index_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_chunks_well_formed(chunks: &[String], max_length: usize) {
        for chunk in chunks {
            assert!(!chunk.trim().is_empty(), "empty chunk emitted");
            assert!(
                chunk.chars().count() <= max_length,
                "chunk of {} chars exceeds limit {}",
                chunk.chars().count(),
                max_length
            );
            let fence_lines = chunk
                .lines()
                .filter(|line| line.trim().starts_with("```"))
                .count();
            assert_eq!(fence_lines % 2, 0, "unterminated fence in chunk:\n{}", chunk);
        }
    }

    /// Lines that carry content, with synthetic/real fence markers dropped.
    fn content_lines(text: &str) -> Vec<String> {
        text.lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with("```"))
            .collect()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("hello world", 2000);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 2000).is_empty());
        assert!(split_text("\n\n\n", 2000).is_empty());
    }

    #[test]
    fn splits_long_prose_at_line_boundaries() {
        let text = (0..100)
            .map(|i| format!("line number {} with some padding text", i))
            .collect::<Vec<_>>()
            .join("\n");

        let chunks = split_text(&text, 200);
        assert!(chunks.len() > 1);
        assert_chunks_well_formed(&chunks, 200);

        let rejoined: Vec<String> = chunks.iter().flat_map(|c| content_lines(c)).collect();
        assert_eq!(rejoined, content_lines(&text));
    }

    #[test]
    fn open_fence_is_closed_and_reopened_across_chunks() {
        let body = (0..50)
            .map(|i| format!("let x{} = {};", i, i))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("```rust\n{}\n```", body);

        let chunks = split_text(&text, 200);
        assert!(chunks.len() > 1);
        assert_chunks_well_formed(&chunks, 200);

        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with("```"), "chunk not closed:\n{}", chunk);
        }
        for chunk in &chunks[1..] {
            assert!(chunk.starts_with("```"), "chunk not reopened:\n{}", chunk);
        }
    }

    #[test]
    fn fence_left_open_at_end_of_input_is_closed() {
        let chunks = split_text("```lua\nprint(1)", 2000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].ends_with("```"));
        assert_chunks_well_formed(&chunks, 2000);
    }

    #[test]
    fn oversized_line_is_hard_split_not_dropped() {
        let line = "x".repeat(500);
        let chunks = split_text(&line, 100);
        assert!(chunks.len() > 1);
        assert_chunks_well_formed(&chunks, 100);

        let total: usize = chunks.iter().map(|c| c.chars().filter(|&c| c == 'x').count()).sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn hard_split_respects_multibyte_boundaries() {
        let line = "héllö wörld ".repeat(60);
        let chunks = split_text(&line, 100);
        assert_chunks_well_formed(&chunks, 100);
    }

    #[test]
    fn round_trip_preserves_content_lines() {
        let text = "Intro paragraph.\n\n```lua\nprint(\"hello\")\nreturn 42\n```\n\nClosing remarks.";
        let chunks = split_text(text, 2000);
        assert_eq!(chunks.len(), 1);

        let rejoined: Vec<String> = chunks.iter().flat_map(|c| content_lines(c)).collect();
        assert_eq!(rejoined, content_lines(text));
    }

    #[test]
    fn reopened_fence_prefix_cannot_push_chunk_over_the_limit() {
        // A near-budget line arriving right after a fenced chunk boundary
        // lands in a chunk already seeded with the reopen prefix.
        let text = format!(
            "```lua\n{}\n{}\n```",
            "y".repeat(3990),
            "x".repeat(3994)
        );
        let chunks = split_text(&text, 4000);
        assert!(chunks.len() > 1);
        assert_chunks_well_formed(&chunks, 4000);
    }

    #[test]
    fn fenced_content_respects_tiny_limits() {
        let body = (0..40)
            .map(|i| format!("print({:02})", i))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("```lua\n{}\n```", body);

        for limit in [16, 24, 32, 64] {
            let chunks = split_text(&text, limit);
            assert_chunks_well_formed(&chunks, limit);
        }
    }

    #[test]
    fn mixed_prose_and_code_stays_well_formed_at_small_limits() {
        let text = format!(
            "Here is the result:\n```lua\n{}\n```\nAnd some trailing analysis.",
            (0..30).map(|i| format!("print({})", i)).collect::<Vec<_>>().join("\n")
        );

        for limit in [50, 120, 300] {
            let chunks = split_text(&text, limit);
            assert_chunks_well_formed(&chunks, limit);

            let rejoined: Vec<String> = chunks.iter().flat_map(|c| content_lines(c)).collect();
            assert_eq!(rejoined, content_lines(&text), "limit {}", limit);
        }
    }
}
