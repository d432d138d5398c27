pub mod use_cases;

pub use use_cases::ballot::BallotUseCase;
pub use use_cases::fresh_stream::FreshStreamUseCase;
pub use use_cases::ingest::IngestUseCase;
pub use use_cases::shortlist::ShortlistUseCase;
