//! Chunker
//!
//! Splits an object's text into scan units no longer than the configured maximum
//! (counted in characters). Whole lines are packed into a unit until the next line
//! would overflow it; a line that is too long on its own is packed word by word,
//! and a word that is too long on its own is cut at character boundaries.
//!
//! Line terminators and word separators stay inside the unit text. Concatenating
//! the units of an object therefore reproduces the object exactly, and a unit's
//! offset is the number of source characters before it.

mod error;


pub use error::{ChunkError, ChunkResult};

use crate::scanner::types::{ScanUnit, UnitMeta};
use std::io::BufRead;
use unicode_segmentation::UnicodeSegmentation;

/// Chunk text read line by line from `reader`
pub fn chunk_reader<R: BufRead>(
    mut reader: R,
    meta: &UnitMeta,
    max_chunk_size: usize,
) -> ChunkResult<Vec<ScanUnit>> {
    if max_chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }
    meta.validate()?;

    let mut packer = UnitPacker::new(meta, max_chunk_size);
    let mut raw = Vec::new();
    let mut saw_content = false;

    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| ChunkError::Io {
                object_id: meta.object_id.clone(),
                message: e.to_string(),
            })?;
        if read == 0 {
            break;
        }
        saw_content = true;

        // A '\n' byte never falls inside a multi-byte sequence, so lines decode alone
        let line = std::str::from_utf8(&raw).map_err(|_| ChunkError::InvalidEncoding {
            object_id: meta.object_id.clone(),
        })?;
        packer.push_line(line)?;
    }

    let units = packer.finish()?;
    if saw_content && units.is_empty() {
        return Err(ChunkError::ChunkFileFailed {
            object_id: meta.object_id.clone(),
        });
    }
    Ok(units)
}

/// Chunk an in-memory string
pub fn chunk_text(text: &str, meta: &UnitMeta, max_chunk_size: usize) -> ChunkResult<Vec<ScanUnit>> {
    chunk_reader(text.as_bytes(), meta, max_chunk_size)
}

/// Accumulates pieces into a buffer and emits a unit whenever the next piece
/// would push it past the limit
struct UnitPacker<'a> {
    meta: &'a UnitMeta,
    max_chars: usize,
    buffer: String,
    buffer_chars: usize,
    consumed_chars: usize,
    units: Vec<ScanUnit>,
}

impl<'a> UnitPacker<'a> {
    fn new(meta: &'a UnitMeta, max_chars: usize) -> Self {
        Self {
            meta,
            max_chars,
            buffer: String::new(),
            buffer_chars: 0,
            consumed_chars: 0,
            units: Vec::new(),
        }
    }

    fn push_line(&mut self, line: &str) -> ChunkResult<()> {
        let line_chars = line.chars().count();
        if line_chars <= self.max_chars {
            return self.push_piece(line, line_chars);
        }

        // Too long for any unit: close the current one and pack by words
        self.emit()?;
        for word in line.split_word_bounds() {
            let word_chars = word.chars().count();
            if word_chars <= self.max_chars {
                self.push_piece(word, word_chars)?;
            } else {
                self.push_split_word(word)?;
            }
        }
        Ok(())
    }

    fn push_split_word(&mut self, word: &str) -> ChunkResult<()> {
        let mut piece = String::new();
        let mut piece_chars = 0;
        for ch in word.chars() {
            if piece_chars == self.max_chars {
                self.push_piece(&piece, piece_chars)?;
                piece.clear();
                piece_chars = 0;
            }
            piece.push(ch);
            piece_chars += 1;
        }
        if piece_chars > 0 {
            self.push_piece(&piece, piece_chars)?;
        }
        Ok(())
    }

    fn push_piece(&mut self, piece: &str, piece_chars: usize) -> ChunkResult<()> {
        if self.buffer_chars + piece_chars > self.max_chars {
            self.emit()?;
        }
        self.buffer.push_str(piece);
        self.buffer_chars += piece_chars;
        Ok(())
    }

    fn emit(&mut self) -> ChunkResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.buffer);
        let unit = ScanUnit::new(self.meta, text, self.consumed_chars)?;
        self.consumed_chars += self.buffer_chars;
        self.buffer_chars = 0;
        self.units.push(unit);
        Ok(())
    }

    fn finish(mut self) -> ChunkResult<Vec<ScanUnit>> {
        self.emit()?;
        Ok(self.units)
    }
}
