//! File-backed knowledge index for AI agents.
//!
//! memdex stores short typed records ("memories") in a line-oriented JSON file, ranks
//! them against a query with a blend of keyword overlap, embedding similarity, and a
//! decay-aware importance term, and keeps a typed relation graph between records that
//! is walked at query time to surface related context.
//!
//! | Type | Typical content |
//! |------|-----------------|
//! | **learning** | Something found out while working |
//! | **decision** | A choice that was made and why |
//! | **interaction** | A notable exchange with a person |
//! | **event** | Something that happened |
//! | **insight** | A conclusion drawn from several of the above |
//!
//! # Architecture
//!
//! - **Storage**: one metadata header line followed by one JSON record per line
//!   (`.jsonl`); legacy single-JSON files are converted on first open
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions), stored as
//!   base64 little-endian `f32`
//! - **Search**: `0.6 × semantic + 0.4 × keyword` plus effective importance, falling back
//!   to keyword-only when no vector is available
//! - **Graph**: paired typed edges (`caused` ↔ `caused_by`, …) with breadth-limited
//!   expansion of results
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`embedding`]: Embedding provider trait, single-flight loader, and local ONNX backend
//! - [`memory`]: Core engine: codec, store, scoring, search, relations, and auto-linking

pub mod config;
pub mod embedding;
pub mod memory;
