#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::{PerCpuArray, XskMap},
    programs::XdpContext,
};
use wraith_xdp_common::{
    filter::{classify, FrameClass},
    frame::FrameBounds,
    stats, SOCKET_TABLE_CAPACITY,
};

// Map helpers (lookup, redirect) are gated on a GPL-compatible license tag.
#[no_mangle]
#[link_section = "license"]
pub static _license: [u8; 4] = *b"GPL\0";

/// RX queue index -> AF_XDP socket. Populated by the userspace control
/// plane; a queue without an entry drops its matching traffic.
#[map]
static XSKS_MAP: XskMap = XskMap::with_max_entries(SOCKET_TABLE_CAPACITY, 0);

/// Per-CPU counters, slot indices per `wraith_xdp_common::stats`. Summed
/// across CPUs by the userspace agent.
#[map]
static STATS: PerCpuArray<u64> = PerCpuArray::with_max_entries(stats::SLOT_COUNT, 0);

/// XDP entry point, invoked once per received frame.
///
/// WRAITH-eligible frames (non-fragmented UDP, destination port in range)
/// are redirected to the AF_XDP socket registered for the frame's RX queue,
/// or dropped if none is registered. Everything else passes to the kernel
/// stack untouched, with no counter mutation.
#[xdp]
pub fn wraith_xdp(ctx: XdpContext) -> u32 {
    // Safety: ctx.data()..ctx.data_end() is the frame the kernel handed to
    // this invocation, readable for its duration.
    let frame = unsafe { FrameBounds::new(ctx.data(), ctx.data_end()) };

    match classify(&frame) {
        FrameClass::Other => xdp_action::XDP_PASS,
        FrameClass::Wraith => {
            // Receive counters are committed before the redirect attempt;
            // the dispatch outcome is accounted separately below.
            bump_stat(stats::RX_PACKETS, 1);
            bump_stat(stats::RX_BYTES, frame.len() as u64);

            let queue_id = unsafe { (*ctx.ctx).rx_queue_index };
            match XSKS_MAP.redirect(queue_id, 0) {
                Ok(action) => {
                    bump_stat(stats::REDIRECTED, 1);
                    action
                }
                // No socket for this queue, or the helper returned anything
                // other than XDP_REDIRECT.
                Err(_) => {
                    bump_stat(stats::DROPPED, 1);
                    xdp_action::XDP_DROP
                }
            }
        }
    }
}

/// Add `delta` to this CPU's slot. An absent slot is a silent no-op; the
/// array is provisioned by the loader.
#[inline(always)]
fn bump_stat(slot: u32, delta: u64) {
    if let Some(value) = STATS.get_ptr_mut(slot) {
        unsafe { *value += delta };
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
