// Wii Balance Board driver - shared library for the CLI
// Config file handling

pub mod config;
