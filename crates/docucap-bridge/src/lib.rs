// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docucap-bridge — Host boundary for the Docucap capture engine.
//
// Camera hosts (Android, iOS, Flutter) drive the engine through the C ABI in
// `ffi`. Analysis results cross as flat JSON records (`wire`), enhanced
// pixels as owned handles (`handle`) that the host releases exactly once.

pub mod ffi;
pub mod handle;
pub mod wire;

pub use handle::EnhancementHandle;
pub use wire::{AnalysisRecord, ErrorRecord, encode_analysis};
