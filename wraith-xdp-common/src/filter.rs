//! The per-frame classification walk: Ethernet -> IPv4/IPv6 -> UDP ->
//! destination-port check.
//!
//! Every header is claimed through [`FrameBounds::ptr_at`] before it is
//! touched, and fields are read one at a time with `read_unaligned` --
//! whole-struct copies compile to `memcpy` calls in the `.text` section,
//! which the BPF loader cannot relocate. Any failure along the walk means
//! the frame is not ours and classifies as [`FrameClass::Other`].

use core::ptr;

use network_types::{
    eth::{EthHdr, EtherType},
    ip::{IpProto, Ipv4Hdr, Ipv6Hdr},
    udp::UdpHdr,
};

use crate::frame::FrameBounds;
use crate::{WRAITH_PORT_MAX, WRAITH_PORT_MIN};

/// MF flag plus the 13-bit fragment offset, host order. Any of these bits
/// set means the datagram is split across frames. DF (0x4000) is not a
/// fragmentation signal and must stay out of this mask.
const IPV4_FRAG_BITS: u16 = 0x3fff;

/// Terminal classification of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Non-fragmented UDP with a destination port inside the WRAITH range;
    /// eligible for redirect to the zero-copy path.
    Wraith,
    /// Everything else: truncated, non-IP, fragmented, non-UDP, or out of
    /// port range. Belongs to the kernel stack.
    Other,
}

/// True iff `dport` (host order) falls in the WRAITH port range, both ends
/// inclusive.
#[inline(always)]
pub fn is_wraith_port(dport: u16) -> bool {
    (WRAITH_PORT_MIN..=WRAITH_PORT_MAX).contains(&dport)
}

/// Classify one frame. Total and deterministic: no state is read besides
/// the frame bytes, and every path terminates without loops.
#[inline(always)]
pub fn classify(frame: &FrameBounds) -> FrameClass {
    match try_classify(frame) {
        Ok(class) => class,
        Err(()) => FrameClass::Other,
    }
}

#[inline(always)]
fn try_classify(frame: &FrameBounds) -> Result<FrameClass, ()> {
    let eth_hdr: *const EthHdr = frame.ptr_at(0)?;
    let ether_type = unsafe { ptr::read_unaligned(ptr::addr_of!((*eth_hdr).ether_type)) };

    let dst_port = match ether_type {
        EtherType::Ipv4 => {
            let ip_hdr = parse_ipv4(frame)?;
            udp_dst_port_v4(frame, ip_hdr)?
        }
        EtherType::Ipv6 => {
            let ip_hdr = parse_ipv6(frame)?;
            udp_dst_port_v6(frame, ip_hdr)?
        }
        _ => return Ok(FrameClass::Other),
    };

    if is_wraith_port(dst_port) {
        Ok(FrameClass::Wraith)
    } else {
        Ok(FrameClass::Other)
    }
}

/// IPv4 header at the fixed post-Ethernet offset. Rejects short frames,
/// wrong version nibbles, and any fragment of a split datagram.
#[inline(always)]
fn parse_ipv4(frame: &FrameBounds) -> Result<*const Ipv4Hdr, ()> {
    let ip_hdr: *const Ipv4Hdr = frame.ptr_at(EthHdr::LEN)?;

    // First header byte: version in the high nibble, IHL in the low one.
    let vihl = unsafe { ptr::read_unaligned(ip_hdr as *const u8) };
    if vihl >> 4 != 4 {
        return Err(());
    }

    let frag_off =
        u16::from_be(unsafe { ptr::read_unaligned(ptr::addr_of!((*ip_hdr).frag_off)) });
    if frag_off & IPV4_FRAG_BITS != 0 {
        return Err(());
    }

    Ok(ip_hdr)
}

/// IPv6 header at the fixed post-Ethernet offset. Fixed 40-byte length;
/// extension headers are not walked, so a fragmented v6 datagram simply
/// fails the UDP check downstream.
#[inline(always)]
fn parse_ipv6(frame: &FrameBounds) -> Result<*const Ipv6Hdr, ()> {
    let ip_hdr: *const Ipv6Hdr = frame.ptr_at(EthHdr::LEN)?;

    let vtc = unsafe { ptr::read_unaligned(ip_hdr as *const u8) };
    if vtc >> 4 != 6 {
        return Err(());
    }

    Ok(ip_hdr)
}

/// Destination port of the UDP header behind an IPv4 header, honoring the
/// variable header length (IHL field, 4-byte units) exactly.
#[inline(always)]
fn udp_dst_port_v4(frame: &FrameBounds, ip_hdr: *const Ipv4Hdr) -> Result<u16, ()> {
    let proto = unsafe { ptr::read_unaligned(ptr::addr_of!((*ip_hdr).proto)) };
    if proto != IpProto::Udp {
        return Err(());
    }

    let vihl = unsafe { ptr::read_unaligned(ip_hdr as *const u8) };
    let ip_hdr_len = (vihl & 0x0f) as usize * 4;

    let udp_hdr: *const UdpHdr = frame.ptr_at(EthHdr::LEN + ip_hdr_len)?;
    Ok(u16::from_be(unsafe {
        ptr::read_unaligned(ptr::addr_of!((*udp_hdr).dest))
    }))
}

/// Destination port of the UDP header immediately behind the fixed-length
/// IPv6 header.
#[inline(always)]
fn udp_dst_port_v6(frame: &FrameBounds, ip_hdr: *const Ipv6Hdr) -> Result<u16, ()> {
    let next_hdr = unsafe { ptr::read_unaligned(ptr::addr_of!((*ip_hdr).next_hdr)) };
    if next_hdr != IpProto::Udp {
        return Err(());
    }

    let udp_hdr: *const UdpHdr = frame.ptr_at(EthHdr::LEN + Ipv6Hdr::LEN)?;
    Ok(u16::from_be(unsafe {
        ptr::read_unaligned(ptr::addr_of!((*udp_hdr).dest))
    }))
}
