// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

use std::ffi::CString;

use log::{debug, info, warn};
use lstdio::{dlperror, lprintf};

fn main() {
    lstdio::setup_lstdio();

    // An optional argument names a log file to send stdout and stderr to.
    if let Some(path) = std::env::args().nth(1) {
        match CString::new(path) {
            Ok(path) => lstdio::redirect_stdio(&path),
            Err(_) => {
                let _ = lprintf!("[ERROR]: log file name contains a NUL byte\n");
            }
        }
    }

    unsafe {
        lstdio::set_logger().unwrap();
    }

    let _ = lprintf!("[INFO]: Hello world from Rust, pid {}\n", std::process::id());
    let _ = lprintf!("this line has no tag, so it gets the default one\n");
    let _ = lprintf!("[DEBUG]: only shown with LOG_LEVEL=D\n");
    let _ = lprintf!("[REMOTE]: always shown\n");

    info!("through the log facade");
    debug!("facade debug, also filtered");
    warn!("threshold is {}", lstdio::ENGINE.filter().threshold());

    if std::fs::File::open("/nonexistent/lstdio").is_err() {
        let _ = dlperror!("open");
    }
}
