use crate::error::ChatError;
use bat::PrettyPrinter;
use futures_util::Stream;
use std::io::Write;
use tokio_stream::StreamExt;

/// Renders the snapshot stream to the terminal. Each item is a
/// prefix-extension of the last, so the freshly generated text is the
/// suffix past what has already been printed. Fenced code blocks are held
/// back, pretty-printed when the fence closes and collected for `/copy`.
/// Returns the complete response text.
pub async fn process_response(
    stream: impl Stream<Item = Result<String, ChatError>>,
    code_blocks: &mut Vec<String>,
) -> Result<String, ChatError> {
    let mut renderer = Renderer::new();
    let mut full_response = String::new();

    tokio::pin!(stream);

    while let Some(item) = stream.next().await {
        match item {
            Ok(snapshot) => {
                let delta = &snapshot[full_response.len()..];
                renderer.feed(delta, code_blocks);
                full_response = snapshot;
            }
            Err(err) => {
                renderer.flush(code_blocks);
                return Err(err);
            }
        }
    }

    renderer.flush(code_blocks);
    Ok(full_response)
}

/// Line-buffered terminal renderer: plain text streams to stdout as it
/// arrives, fenced code is held and pretty-printed through `bat` once the
/// closing fence shows up.
struct Renderer {
    pending_line: String,
    /// How much of `pending_line` is already on screen.
    printed: usize,
    in_code_block: bool,
    code: String,
    language: String,
}

impl Renderer {
    fn new() -> Self {
        Renderer {
            pending_line: String::new(),
            printed: 0,
            in_code_block: false,
            code: String::new(),
            language: String::new(),
        }
    }

    fn feed(&mut self, delta: &str, code_blocks: &mut Vec<String>) {
        for ch in delta.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.pending_line);
                if self.printed > 0 {
                    // The line was already streamed, minus its tail.
                    println!("{}", &line[self.printed..]);
                    self.printed = 0;
                } else {
                    self.handle_line(&line, code_blocks);
                }
            } else {
                self.pending_line.push(ch);
            }
        }
        // Stream the partial line unless it could still turn out to be a
        // code fence, which must be intercepted whole.
        if !self.in_code_block && self.printed < self.pending_line.len() {
            let head = self.pending_line.trim_start();
            if !head.is_empty() && !head.starts_with('`') {
                print!("{}", &self.pending_line[self.printed..]);
                let _ = std::io::stdout().flush();
                self.printed = self.pending_line.len();
            }
        }
    }

    fn handle_line(&mut self, line: &str, code_blocks: &mut Vec<String>) {
        if line.trim_start().starts_with("```") {
            if self.in_code_block {
                self.print_code_block(code_blocks);
            } else {
                self.language = line.trim_start().trim_start_matches('`').trim().to_string();
            }
            self.in_code_block = !self.in_code_block;
        } else if self.in_code_block {
            self.code.push_str(line);
            self.code.push('\n');
        } else {
            println!("{}", line);
        }
    }

    /// Flush whatever is buffered at end of stream, including an unclosed
    /// code block from a truncated response.
    fn flush(&mut self, code_blocks: &mut Vec<String>) {
        if !self.pending_line.is_empty() {
            let line = std::mem::take(&mut self.pending_line);
            if self.printed > 0 {
                println!("{}", &line[self.printed..]);
                self.printed = 0;
            } else {
                self.handle_line(&line, code_blocks);
            }
        }
        if self.in_code_block && !self.code.is_empty() {
            self.print_code_block(code_blocks);
            self.in_code_block = false;
        }
        println!();
        let _ = std::io::stdout().flush();
    }

    fn print_code_block(&mut self, code_blocks: &mut Vec<String>) {
        let code = std::mem::take(&mut self.code);
        let language = if self.language.is_empty() {
            "rust".to_string()
        } else {
            std::mem::take(&mut self.language)
        };
        if PrettyPrinter::new()
            .input_from_bytes(code.as_bytes())
            .language(&language)
            .print()
            .is_err()
        {
            // Unknown language tag; show the block plain rather than drop it.
            print!("{}", code);
        }
        println!();
        code_blocks.push(code);
        self.language.clear();
    }
}
