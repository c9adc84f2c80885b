// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Compiler detection, shared library builds and Python `ctypes`
//! binding generation for C/C++ sources

pub use self::platform::Platform;

pub mod annotation;
pub mod binding;
pub mod build;
pub mod platform;
pub mod toolchain;
pub mod util;
