use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProbeResult, RecallsResult, RefreshResult, SearchResult, StatsResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_recalls(result: &RecallsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_stats(result: &StatsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_search(result: &SearchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_refresh(result: &RefreshResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_probe(result: &ProbeResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()
    }
}
