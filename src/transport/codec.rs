use crate::message::{AsRawIRC, ClientCommand};
use bytes::{Buf, BufMut, BytesMut};
use std::cmp;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Lines longer than this are discarded by default. Tagged Twitch lines stay
/// well below this.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Errors raised while reading or writing protocol lines.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The underlying socket failed.
    #[error("{0}")]
    IOError(#[from] std::io::Error),
    /// An outgoing command would have spanned more than one line.
    #[error("refusing to send {0} command containing a line break")]
    NewlineInCommand(String),
}

/// Splits the incoming byte stream into protocol lines and writes outgoing
/// commands followed by CRLF.
///
/// Lines end at `\n`; a `\r` right before it is removed as well. Bytes that are
/// not valid UTF-8 are replaced with U+FFFD. A line exceeding the maximum length
/// is dropped up to and including its terminator. An unterminated fragment left
/// over when the stream ends is dropped too.
#[derive(Debug, Clone)]
pub struct LineCodec {
    // index into the buffer up to which no `\n` was found yet
    next_index: usize,
    max_length: usize,
    is_discarding: bool,
}

impl LineCodec {
    /// A codec accepting lines of up to `max_length` bytes, terminator excluded.
    pub fn new(max_length: usize) -> LineCodec {
        LineCodec {
            next_index: 0,
            max_length,
            is_discarding: false,
        }
    }

    /// The configured maximum line length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> LineCodec {
        LineCodec::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

fn strip_terminator(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = FramingError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, FramingError> {
        loop {
            // a line of max_length bytes plus its CRLF
            let read_to = cmp::min(self.max_length.saturating_add(2), buf.len());

            let newline_offset = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.is_discarding, newline_offset) {
                (true, Some(offset)) => {
                    buf.advance(offset + self.next_index + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = offset + self.next_index;
                    self.next_index = 0;
                    let raw = buf.split_to(newline_index + 1);
                    let content = strip_terminator(&raw);
                    if content.len() > self.max_length {
                        tracing::warn!(
                            "Dropping incoming line of {} bytes (maximum is {})",
                            content.len(),
                            self.max_length
                        );
                        continue;
                    }
                    return Ok(Some(String::from_utf8_lossy(content).into_owned()));
                }
                (false, None) if buf.len() >= self.max_length.saturating_add(2) => {
                    tracing::warn!(
                        "Incoming line exceeds {} bytes, discarding until next line break",
                        self.max_length
                    );
                    self.is_discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, FramingError> {
        match self.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !buf.is_empty() && !self.is_discarding {
                    tracing::debug!(
                        "Dropping {} bytes of unterminated data at end of stream",
                        buf.len()
                    );
                }
                buf.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<ClientCommand> for LineCodec {
    type Error = FramingError;

    fn encode(&mut self, command: ClientCommand, dst: &mut BytesMut) -> Result<(), FramingError> {
        if command.contains_newline() {
            return Err(FramingError::NewlineInCommand(command.command));
        }

        let line = command.as_raw_irc();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut lines = vec![];
        while let Some(line) = codec.decode(buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    /// Feed `input` to a fresh codec in pieces delimited by `cuts`.
    fn decode_in_chunks(input: &[u8], cuts: &[usize]) -> Vec<String> {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        let mut lines = vec![];
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&input.len())) {
            buf.extend_from_slice(&input[start..cut]);
            lines.extend(decode_all(&mut codec, &mut buf));
            start = cut;
        }
        lines.extend(codec.decode_eof(&mut buf).unwrap());
        lines
    }

    const STREAM: &[u8] = b"PING :tmi.twitch.tv\r\n:bob!bob@bob.tmi.twitch.tv PRIVMSG #teststream :gg \xF0\x9F\x98\x80 ok\r\n:tmi.twitch.tv 001 justinfan12345 :Welcome, GLHF!\r\n";

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(STREAM);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![
                "PING :tmi.twitch.tv".to_owned(),
                ":bob!bob@bob.tmi.twitch.tv PRIVMSG #teststream :gg \u{1F600} ok".to_owned(),
                ":tmi.twitch.tv 001 justinfan12345 :Welcome, GLHF!".to_owned(),
            ]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_split_reads_give_same_lines() {
        let unsplit = decode_in_chunks(STREAM, &[]);
        assert_eq!(unsplit.len(), 3);

        // every single cut position, including ones inside the CRLF and inside
        // the four byte emoji
        for cut in 1..STREAM.len() {
            assert_eq!(decode_in_chunks(STREAM, &[cut]), unsplit, "cut at {}", cut);
        }

        // byte-by-byte
        let every_byte = (1..STREAM.len()).collect::<Vec<_>>();
        assert_eq!(decode_in_chunks(STREAM, &every_byte), unsplit);

        // a few uneven multi-cut splits
        for step in [2, 3, 7, 13] {
            let cuts = (step..STREAM.len()).step_by(step).collect::<Vec<_>>();
            assert_eq!(decode_in_chunks(STREAM, &cuts), unsplit, "step {}", step);
        }
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"PING :tmi"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b".twitch.tv\r");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PING :tmi.twitch.tv".to_owned())
        );
    }

    #[test]
    fn test_bare_lf_and_empty_lines() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"a\n\r\nb\r\n"[..]);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec!["a".to_owned(), "".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"hi \xFF\xFE there\r\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("hi \u{FFFD}\u{FFFD} there".to_owned())
        );
    }

    #[test]
    fn test_unterminated_data_at_eof_is_dropped() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"complete\r\nincompl"[..]);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("complete".to_owned()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overlong_line_is_discarded() {
        let mut codec = LineCodec::new(8);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"0123456789abcdef");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ghij\r\nshort\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("short".to_owned()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_line_at_max_length_is_kept() {
        let mut codec = LineCodec::new(5);
        let mut buf = BytesMut::from(&b"12345\r\n123456\r\nok\r\n"[..]);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec!["12345".to_owned(), "ok".to_owned()]
        );
    }

    #[test]
    fn test_encode() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(irc!["PONG"].with_trailing("tmi.twitch.tv"), &mut buf)
            .unwrap();
        codec.encode(irc!["JOIN", "#foo"], &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :tmi.twitch.tv\r\nJOIN #foo\r\n");
    }

    #[test]
    fn test_encode_rejects_newlines() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        let result = codec.encode(irc!["JOIN", "#foo\r\nPART #foo"], &mut buf);
        assert!(matches!(result, Err(FramingError::NewlineInCommand(cmd)) if cmd == "JOIN"));
        assert!(buf.is_empty());
    }
}
