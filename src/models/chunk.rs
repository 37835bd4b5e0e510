/// A bounded slice of source text submitted as one generation unit.
///
/// `start` and `end` are character offsets into the source before trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub content: String,
}
