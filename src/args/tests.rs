use super::*;
use crate::error::{AppError, AppResult};
use clap::Parser;
use std::time::Duration;
