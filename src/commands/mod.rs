// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod ai;
pub mod catalog;
pub mod company;
pub mod config_cmd;
pub mod doctor;
pub mod expenses;
pub mod orders;
pub mod parties;
pub mod payroll;
pub mod products;
pub mod query;
pub mod reports;
