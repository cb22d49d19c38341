// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured stills
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Raster frame │ ──▶ │  Photo Pipeline   │ ──▶ │  JPEG data   │
//! │   (RGBA)     │     │  - RGBA→RGB       │     │     URI      │
//! │              │     │  - Mirror         │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Still conversion and JPEG encoding

pub mod photo;
