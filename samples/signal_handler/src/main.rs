// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Worker threads log in a loop while the main thread keeps signalling the process.  Every line
//! comes out whole, including the ones written from the handler.
//!
//! Run with `LOG_LEVEL=D` to see the workers' debug lines as well.

use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use log::info;
use lstdio::{lperror, lprintf};

const WORKERS: usize = 4;
const ROUNDS: usize = 50;

static CAUGHT: AtomicUsize = AtomicUsize::new(0);
static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_usr1(signal: c_int) {
    let n = CAUGHT.fetch_add(1, Ordering::Relaxed);
    let _ = lprintf!("[REMOTE]: signal {} caught, {} so far\n", signal, n + 1);
}

fn install() -> bool {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_usr1 as extern "C" fn(c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()) == 0
    }
}

fn worker(id: usize) {
    let mut round = 0;
    while !STOP.load(Ordering::Relaxed) {
        let _ = lprintf!("[DEBUG]: worker {} round {}\n", id, round);
        if round % 10 == 0 {
            let _ = lprintf!("[INFO]: worker {} reached round {}\n", id, round);
        }
        round += 1;
        thread::sleep(Duration::from_millis(1));
    }
}

fn main() {
    lstdio::setup_lstdio();
    unsafe {
        lstdio::set_logger().unwrap();
    }

    if !install() {
        let _ = lperror!("sigaction");
        std::process::exit(1);
    }

    let workers: Vec<_> = (0..WORKERS)
        .map(|id| thread::spawn(move || worker(id)))
        .collect();

    for _ in 0..ROUNDS {
        unsafe {
            libc::kill(libc::getpid(), libc::SIGUSR1);
        }
        thread::sleep(Duration::from_millis(5));
    }

    STOP.store(true, Ordering::Relaxed);
    for w in workers {
        let _ = w.join();
    }

    info!("{} signals handled", CAUGHT.load(Ordering::Relaxed));
}
