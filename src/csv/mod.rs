/// This module provides the streaming reader for the participant info CSV export.
pub mod stream_reader;
