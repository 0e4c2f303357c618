pub mod gate;
pub mod hallucination;
pub mod word_count;
