#![forbid(unsafe_code)]

use crate::{JsonRpcRequest, McpServer, json_rpc_error};
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};

const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Wire framing, decided once per process from the first meaningful
/// input and then held for both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    /// One JSON value per line.
    Lines,
    /// LSP-style: `Content-Length` headers, a blank line, then the body.
    Headers,
}

impl Framing {
    fn sniff(line: &str) -> Option<Framing> {
        let trimmed = line.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Some(Framing::Lines);
        }
        let lower = trimmed.to_ascii_lowercase();
        // Clients may lead with Content-Type; any header line means header mode.
        if lower.starts_with("content-length:") || lower.starts_with("content-type:") {
            return Some(Framing::Headers);
        }
        None
    }
}

/// Frame reader over any buffered byte source. Unrecognized input before
/// the framing is known is dropped rather than answered, since there is
/// no way to frame a reply yet.
struct FrameReader<R: Read> {
    reader: BufReader<R>,
    framing: Option<Framing>,
}

impl<R: Read> FrameReader<R> {
    fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            framing: None,
        }
    }

    /// Next request body, or `None` at end of input.
    fn next_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                continue;
            }
            let framing = match self.framing {
                Some(v) => v,
                None => match Framing::sniff(&line) {
                    Some(detected) => {
                        self.framing = Some(detected);
                        detected
                    }
                    None => continue,
                },
            };
            return match framing {
                Framing::Lines => Ok(Some(line.trim().as_bytes().to_vec())),
                Framing::Headers => self.finish_header_frame(line),
            };
        }
    }

    /// Consumes the remaining header lines (`first` is the one already
    /// read) and the body they announce.
    fn finish_header_frame(&mut self, mut first: String) -> std::io::Result<Option<Vec<u8>>> {
        let mut content_length = content_length_of(&first);
        while !first.trim_end().is_empty() {
            first.clear();
            if self.reader.read_line(&mut first)? == 0 {
                // EOF mid-header: connection closed.
                return Ok(None);
            }
            if content_length.is_none() {
                content_length = content_length_of(&first);
            }
        }

        let Some(len) = content_length else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Missing Content-Length header",
            ));
        };
        if len > MAX_FRAME_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Content-Length exceeds max allowed size",
            ));
        }

        let mut body = vec![0u8; len];
        self.reader.read_exact(&mut body)?;
        Ok(Some(body))
    }
}

fn content_length_of(line: &str) -> Option<usize> {
    let (key, value) = line.trim().split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse::<usize>().ok()
}

fn write_response(
    stdout: &mut std::io::StdoutLock<'_>,
    framing: Framing,
    resp: &Value,
) -> Result<(), Box<dyn std::error::Error>> {
    match framing {
        Framing::Lines => writeln!(stdout, "{}", serde_json::to_string(resp)?)?,
        Framing::Headers => {
            let body = serde_json::to_vec(resp)?;
            write!(stdout, "Content-Length: {}\r\n\r\n", body.len())?;
            stdout.write_all(&body)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

pub(crate) fn run_stdio(server: &mut McpServer) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut frames = FrameReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();

    while let Some(body) = frames.next_frame()? {
        if let Some(resp) = dispatch_raw(server, &body) {
            // framing is fixed by the time a frame has been produced
            let framing = frames.framing.unwrap_or(Framing::Lines);
            write_response(&mut stdout, framing, &resp)?;
        }
    }
    Ok(())
}

fn dispatch_raw(server: &mut McpServer, raw: &[u8]) -> Option<Value> {
    let data: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(e) => {
            return Some(json_rpc_error(None, -32700, &format!("Parse error: {e}")));
        }
    };

    let (id, has_method) = match data.as_object() {
        Some(obj) => (obj.get("id").cloned(), obj.contains_key("method")),
        None => {
            return Some(json_rpc_error(None, -32600, "Invalid Request"));
        }
    };
    if !has_method {
        return Some(json_rpc_error(id, -32600, "Invalid Request"));
    }

    let request: JsonRpcRequest = match serde_json::from_value(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(json_rpc_error(id, -32600, &format!("Invalid Request: {e}")));
        }
    };

    server.handle(request)
}
