pub mod ballot;
pub mod fresh_stream;
pub mod ingest;
pub mod shortlist;

#[cfg(test)]
pub(crate) mod testing;
