// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GNSS module
//!
//! Provides the GPS fix sources of the engine. The constant source
//! replays a closed loop of positions at a fixed velocity, which is the
//! fake-GPS mode of the headless program and the driver of end-to-end
//! tests.

pub mod constant_source;

pub use constant_source::ConstantGpsSource;
