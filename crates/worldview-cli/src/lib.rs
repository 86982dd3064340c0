//! worldview-cli
//! =============
//!
//! Terminal host for the `worldview-core` country browser.
//!
//! This crate primarily provides a binary (`worldview`). The library target
//! exists so that a documentation page gets rendered with this overview.
//!
//! Quick start
//! -----------
//!
//! ```text
//! worldview --help
//! worldview countries
//! worldview show canada
//! worldview save canada && worldview saved
//! ```
//!
//! Configuration comes from flags or the environment:
//! `WORLDVIEW_DATASET_URL`, `WORLDVIEW_SAVES_URL`, `WORLDVIEW_BACKEND`
//! (`local` | `remote`) and `WORLDVIEW_DATA_DIR`. `RUST_LOG` overrides the
//! log filter.
//!
//! For programmatic access, use [`worldview-core`] directly.
#![cfg_attr(docsrs, feature(doc_cfg))]
