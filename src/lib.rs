//! # Passage Atlas
//!
//! A query service for hierarchically cited texts (CTS URNs), their
//! cross-version alignments, and annotation layers.
//!
//! A corpus is a tree of text parts (text group, work, version, book,
//! line, ...) indexed by a materialized path and nested intervals, so that
//! passage references like `urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1-1.10`
//! resolve with range scans.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//! │  corpus.json   │──▶│    Flatten     │──▶│     SQLite     │
//! │  nodes+layers  │   │ path + lft/rgt │   │ text_parts ... │
//! └────────────────┘   └────────────────┘   └───────┬────────┘
//!                                                   │
//!                              ┌────────────────────┤
//!                              ▼                    ▼
//!                      ┌────────────────┐   ┌────────────────┐
//!                      │      CLI       │   │      HTTP      │
//!                      │    (atlas)     │   │   JSON + WA    │
//!                      └────────────────┘   └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`corpus`] | Corpus file format and tree flattening |
//! | [`store`] | Tree traversal trait with SQLite and in-memory stores |
//! | [`reference`] | Passage reference parsing and resolution |
//! | [`passage`] | Passage leaves plus ancestor/sibling/children metadata |
//! | [`tree`] | Nested subtree dump |
//! | [`library`] | Version and text-part queries |
//! | [`alignments`] | Text alignments and chunks |
//! | [`annotations`] | Annotation layers, named entities, tokens |
//! | [`web_annotation`] | W3C Web Annotation collections and pages |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod alignments;
pub mod annotations;
pub mod case;
pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod ingest;
pub mod library;
pub mod logging;
pub mod lookup;
pub mod migrate;
pub mod models;
pub mod passage;
pub mod reference;
pub mod server;
pub mod store;
pub mod tree;
pub mod urn;
pub mod web_annotation;
