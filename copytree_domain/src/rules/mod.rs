// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Gitignore-style pattern compilation and the `RulesetFilter`/`LayeredIgnore`
//! engines built on top of it.

pub mod filter;
pub mod pattern;

pub use filter::{IgnoreLayer, LayeredIgnore, RulesetFilter};
pub use pattern::Rule;
