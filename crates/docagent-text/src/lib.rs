//! DocAgent Text — cleaning, sentence segmentation, content analysis, chunking, extraction.

pub mod analyze;
pub mod chunking;
pub mod cleaning;
pub mod file;
pub mod keywords;
pub mod lexical;
pub mod relevance;
pub mod sentences;

pub use analyze::{analyze, ContentProfile, ContentType};
pub use chunking::{Chunk, DocumentChunker, OverlappingChunker};
pub use file::{ExtractedDocument, PlainTextExtractor, TextExtractor};
pub use sentences::{sentence_spans, split_sentences, SentenceSpan};
