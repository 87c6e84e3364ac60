//! The operation catalogue: one constructor per wire operation.
//!
//! Each function encodes its arguments into the exact packets the firmware
//! expects and pairs them with a typed response decoder. Acknowledged
//! operations decode to `true` when the byte after the echoed opcode is
//! `0xC9` and `false` otherwise.

use crate::chunk::{split_chunks, MAX_CHUNKS};
use crate::command::Command;
use crate::error::CodecError;
use crate::side::{Side, Target};

/// Payload budget per text packet.
pub const TEXT_CHUNK_BYTES: usize = 180;
/// Payload budget per notification-config packet.
pub const NOTIFICATION_CHUNK_BYTES: usize = 180;
/// Payload budget per whitelist packet.
pub const WHITELIST_CHUNK_BYTES: usize = 176;
/// Payload budget per bitmap packet.
pub const BITMAP_CHUNK_BYTES: usize = 194;

/// Response prefix of the firmware-info reply (`"net build"` in ASCII).
pub const FIRMWARE_PREFIX: &[u8] = b"net build";

/// Flash address the bitmap is written to; prepended to the first chunk and
/// covered by the transfer checksum.
const BITMAP_ADDRESS_HEADER: [u8; 4] = [0x00, 0x1C, 0x00, 0x00];

/// Brightness applied when the requested level is out of range.
const BRIGHTNESS_FALLBACK: u8 = 30;

fn decode_ack(data: &[u8]) -> Result<bool, CodecError> {
    Ok(data.get(1) == Some(&0xC9))
}

/// Sets display brightness.
///
/// `level` is a percentage; anything above 100 falls back to
/// [`BRIGHTNESS_FALLBACK`]. The device itself takes a 6-bit value, so the
/// percentage is scaled onto 0..=63.
pub fn set_brightness(level: u8, auto: bool) -> Command<bool> {
    let level = if level <= 100 { level } else { BRIGHTNESS_FALLBACK };
    let scaled = (u16::from(level) * 63 / 100) as u8;
    Command::new(
        vec![vec![0x01, scaled, auto as u8]],
        vec![0x01],
        Target::Both,
        decode_ack,
    )
}

/// Enables or disables silent mode.
pub fn set_silent_mode(silent: bool) -> Command<bool> {
    Command::new(
        vec![vec![0x03, silent as u8]],
        vec![0x03],
        Target::Both,
        decode_ack,
    )
}

/// Dashboard layouts supported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardMode {
    Full = 0,
    Dual = 1,
    Minimal = 2,
}

/// Dashboard side panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSubMode {
    Notes = 0,
    Stock = 1,
    News = 2,
    Calendar = 3,
    Navigation = 4,
    Empty1 = 5,
    Empty2 = 6,
}

/// Selects the dashboard layout and panel.
///
/// The minimal layout only has room for the notes panel; any other panel is
/// rejected before a single byte is encoded.
pub fn set_dashboard_mode(
    mode: DashboardMode,
    sub_mode: DashboardSubMode,
) -> Result<Command<bool>, CodecError> {
    if mode == DashboardMode::Minimal && sub_mode != DashboardSubMode::Notes {
        return Err(CodecError::InvalidArgument(
            "minimal dashboard mode only supports the notes panel".into(),
        ));
    }
    Ok(Command::new(
        vec![vec![0x06, 0x07, 0x00, 0x00, 0x06, mode as u8, sub_mode as u8]],
        vec![0x06],
        Target::Both,
        decode_ack,
    ))
}

/// Sets the head-up display angle, clamped to 0..=60 degrees.
pub fn set_head_up_angle(angle: u8) -> Command<bool> {
    Command::new(
        vec![vec![0x0B, angle.min(60), 0x01]],
        vec![0x0B],
        Target::Both,
        decode_ack,
    )
}

/// Enables or disables the microphone.
pub fn set_microphone_enabled(enabled: bool) -> Command<bool> {
    Command::new(
        vec![vec![0x0E, enabled as u8]],
        vec![0x0E],
        Target::Both,
        decode_ack,
    )
}

/// Starts or continues a bitmap transfer.
///
/// The 1-bit BMP payload is split into chunks of at most
/// [`BITMAP_CHUNK_BYTES`]; the first packet carries the flash address header
/// between the sequence byte and the payload. After the final chunk is
/// acknowledged the caller must run [`bitmap_crc`] and then
/// [`end_bitmap_transfer`].
pub fn send_bitmap(data: &[u8]) -> Result<Command<bool>, CodecError> {
    let chunks = split_chunks(data, BITMAP_CHUNK_BYTES);
    if chunks.len() > MAX_CHUNKS {
        return Err(CodecError::PayloadTooLarge {
            chunks: chunks.len(),
        });
    }
    let packets = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut packet = Vec::with_capacity(6 + chunk.len());
            packet.push(0x15);
            packet.push(i as u8);
            if i == 0 {
                packet.extend_from_slice(&BITMAP_ADDRESS_HEADER);
            }
            packet.extend_from_slice(chunk);
            packet
        })
        .collect();
    Ok(Command::new(packets, vec![0x15], Target::Left, decode_ack))
}

/// Asks the device to verify a completed bitmap transfer.
///
/// The checksum is CRC-32 over the flash address header followed by the
/// original bitmap payload, transmitted most significant byte first.
pub fn bitmap_crc(data: &[u8]) -> Command<bool> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&BITMAP_ADDRESS_HEADER);
    hasher.update(data);
    let crc = hasher.finalize();

    let mut packet = Vec::with_capacity(5);
    packet.push(0x16);
    packet.extend_from_slice(&crc.to_be_bytes());
    Command::new(vec![packet], vec![0x16], Target::Both, decode_ack)
}

/// Exits the current app back to the dashboard.
pub fn exit_app() -> Command<bool> {
    Command::new(vec![vec![0x18]], vec![0x18], Target::Both, decode_ack)
}

/// Finishes a bitmap transfer and shows the image.
pub fn end_bitmap_transfer() -> Command<bool> {
    Command::new(
        vec![vec![0x20, 0x0D, 0x0E]],
        vec![0x20],
        Target::Both,
        decode_ack,
    )
}

fn decode_firmware(data: &[u8]) -> Result<String, CodecError> {
    let needed = FIRMWARE_PREFIX.len() + 4;
    let body = data.get(FIRMWARE_PREFIX.len()..).unwrap_or(&[]);
    if body.len() < 4 {
        return Err(CodecError::ShortResponse {
            needed,
            got: data.len(),
        });
    }
    Ok(format!("{}.{}.{}.{}", body[0], body[1], body[2], body[3]))
}

/// Queries the firmware build version.
///
/// The reply starts with the ASCII marker `"net build"`; the four bytes
/// after the marker are the version number.
pub fn firmware_info() -> Command<String> {
    Command::new(
        vec![vec![0x23]],
        FIRMWARE_PREFIX.to_vec(),
        Target::Both,
        decode_firmware,
    )
}

/// Reboots the device firmware.
pub fn quick_restart() -> Command<bool> {
    Command::new(vec![vec![0x23, 0x72]], vec![0x23], Target::Both, decode_ack)
}

/// Keep-alive ping.
///
/// The packet is length-prefixed (always 6, little-endian) and carries the
/// sequence number twice, the second copy incremented.
pub fn heartbeat(seq: u8) -> Command<bool> {
    let length: u16 = 6;
    Command::new(
        vec![vec![
            0x25,
            (length & 0xFF) as u8,
            (length >> 8) as u8,
            seq,
            0x04,
            seq.wrapping_add(1),
        ]],
        vec![0x25],
        Target::Both,
        decode_ack,
    )
}

/// Enables or disables wear detection.
pub fn set_wear_detection(enabled: bool) -> Command<bool> {
    Command::new(
        vec![vec![0x27, enabled as u8]],
        vec![0x27],
        Target::Both,
        decode_ack,
    )
}

fn decode_battery(data: &[u8]) -> Result<u8, CodecError> {
    data.get(2).copied().ok_or(CodecError::ShortResponse {
        needed: 3,
        got: data.len(),
    })
}

/// Queries the battery percentage of one arm.
pub fn battery(side: Side) -> Command<u8> {
    Command::new(vec![vec![0x2C]], vec![0x2C], side.into(), decode_battery)
}

/// Queries device uptime.
pub fn device_uptime() -> Command<bool> {
    Command::new(vec![vec![0x37]], vec![0x37], Target::Both, decode_ack)
}

/// Fetches the on-device usage counters.
pub fn usage_report() -> Command<bool> {
    Command::new(vec![vec![0x3E]], vec![0x3E], Target::Both, decode_ack)
}

/// Opens the protocol session after both sides are connected.
pub fn initialize() -> Command<bool> {
    Command::new(vec![vec![0x4D, 0xFB]], vec![0x4D], Target::Both, decode_ack)
}

/// Displays text on the glasses.
///
/// UTF-8 bytes are split into chunks of at most [`TEXT_CHUNK_BYTES`]; packet
/// `i` of `n` carries the paging header
/// `[0x4E, i, n, i, 0x71, 0x00, 0x00, i + 1, n]` ahead of its chunk.
pub fn send_text(text: &str) -> Result<Command<bool>, CodecError> {
    let chunks = split_chunks(text.as_bytes(), TEXT_CHUNK_BYTES);
    if chunks.len() > MAX_CHUNKS {
        return Err(CodecError::PayloadTooLarge {
            chunks: chunks.len(),
        });
    }
    let total = chunks.len() as u8;
    let packets = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let i = i as u8;
            let mut packet = Vec::with_capacity(9 + chunk.len());
            // 0x71 = text screen (0x70) with the new-content bit set
            packet.extend_from_slice(&[0x4E, i, total, i, 0x71, 0x00, 0x00, i + 1, total]);
            packet.extend_from_slice(chunk);
            packet
        })
        .collect();
    // The ack echoes the text opcode. Some captures show 0x04 here, but that
    // byte belongs to the notification-config ack and would collide with it.
    Ok(Command::new(packets, vec![0x4E], Target::Left, decode_ack))
}

fn json_config(opcode: u8, budget: usize, json: &str) -> Result<Command<bool>, CodecError> {
    let chunks = split_chunks(json.as_bytes(), budget);
    if chunks.len() > MAX_CHUNKS {
        return Err(CodecError::PayloadTooLarge {
            chunks: chunks.len(),
        });
    }
    let total = chunks.len() as u8;
    let packets = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut packet = Vec::with_capacity(3 + chunk.len());
            packet.extend_from_slice(&[opcode, total, i as u8]);
            packet.extend_from_slice(chunk);
            packet
        })
        .collect();
    Ok(Command::new(packets, vec![opcode], Target::Left, decode_ack))
}

/// Uploads the JSON notification configuration.
pub fn set_notification_config(json: &str) -> Result<Command<bool>, CodecError> {
    json_config(0x04, NOTIFICATION_CHUNK_BYTES, json)
}

/// Uploads the JSON app whitelist.
pub fn set_whitelist(json: &str) -> Result<Command<bool>, CodecError> {
    json_config(0x4B, WHITELIST_CHUNK_BYTES, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_scales_the_level_onto_six_bits() {
        let cmd = set_brightness(50, true);
        assert_eq!(cmd.packets(), &[vec![0x01, 0x1F, 0x01]]);
        assert_eq!(cmd.response_prefix(), &[0x01]);
        assert_eq!(cmd.target(), Target::Both);
    }

    #[test]
    fn brightness_endpoints_and_fallback() {
        assert_eq!(set_brightness(0, false).packets()[0][1], 0);
        assert_eq!(set_brightness(100, false).packets()[0][1], 63);
        // out of range falls back to 30% -> 18
        assert_eq!(set_brightness(150, false).packets()[0][1], 18);
        assert_eq!(set_brightness(255, false).packets()[0][1], 18);
    }

    #[test]
    fn brightness_auto_flag_is_the_trailing_byte() {
        assert_eq!(set_brightness(50, false).packets()[0][2], 0x00);
        assert_eq!(set_brightness(50, true).packets()[0][2], 0x01);
    }

    #[test]
    fn ack_decoder_reads_the_byte_after_the_opcode() {
        let cmd = set_silent_mode(true);
        assert_eq!(cmd.decode(&[0x03, 0xC9]).unwrap(), true);
        assert_eq!(cmd.decode(&[0x03, 0x00]).unwrap(), false);
        assert_eq!(cmd.decode(&[0x03]).unwrap(), false);
    }

    #[test]
    fn heartbeat_carries_the_sequence_twice() {
        let cmd = heartbeat(0x01);
        assert_eq!(cmd.packets(), &[vec![0x25, 0x06, 0x00, 0x01, 0x04, 0x02]]);
    }

    #[test]
    fn heartbeat_sequence_wraps() {
        let cmd = heartbeat(0xFF);
        assert_eq!(cmd.packets()[0][3], 0xFF);
        assert_eq!(cmd.packets()[0][5], 0x00);
    }

    #[test]
    fn head_up_angle_is_clamped_to_sixty() {
        assert_eq!(set_head_up_angle(45).packets(), &[vec![0x0B, 45, 0x01]]);
        assert_eq!(set_head_up_angle(200).packets(), &[vec![0x0B, 60, 0x01]]);
    }

    #[test]
    fn dashboard_minimal_only_accepts_notes() {
        let err = set_dashboard_mode(DashboardMode::Minimal, DashboardSubMode::Stock)
            .expect_err("stock panel must be rejected in minimal mode");
        assert!(matches!(err, CodecError::InvalidArgument(_)));

        let cmd = set_dashboard_mode(DashboardMode::Minimal, DashboardSubMode::Notes).unwrap();
        assert_eq!(
            cmd.packets(),
            &[vec![0x06, 0x07, 0x00, 0x00, 0x06, 0x02, 0x00]]
        );
    }

    #[test]
    fn battery_decodes_the_third_byte() {
        let cmd = battery(Side::Left);
        assert_eq!(cmd.packets(), &[vec![0x2C]]);
        assert_eq!(cmd.target(), Target::Left);
        assert_eq!(cmd.decode(&[0x2C, 0x66, 87]).unwrap(), 87);
        assert!(matches!(
            cmd.decode(&[0x2C, 0x66]),
            Err(CodecError::ShortResponse { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn firmware_version_comes_from_the_bytes_after_the_marker() {
        let cmd = firmware_info();
        assert_eq!(cmd.packets(), &[vec![0x23]]);
        assert_eq!(cmd.response_prefix(), b"net build");

        let mut frame = b"net build".to_vec();
        frame.extend_from_slice(&[1, 5, 0, 12]);
        assert_eq!(cmd.decode(&frame).unwrap(), "1.5.0.12");
    }

    #[test]
    fn short_firmware_reply_is_a_decode_error() {
        let cmd = firmware_info();
        let mut frame = b"net build".to_vec();
        frame.extend_from_slice(&[1, 5]);
        assert!(matches!(
            cmd.decode(&frame),
            Err(CodecError::ShortResponse { .. })
        ));
    }

    #[test]
    fn text_packets_carry_the_paging_header() {
        let cmd = send_text("hello").unwrap();
        let packets = cmd.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(
            packets[0],
            [&[0x4E, 0, 1, 0, 0x71, 0x00, 0x00, 1, 1][..], b"hello"].concat()
        );
        assert_eq!(cmd.target(), Target::Left);
    }

    #[test]
    fn long_text_is_split_into_numbered_pages() {
        let text = "x".repeat(400);
        let cmd = send_text(&text).unwrap();
        let packets = cmd.packets();
        assert_eq!(packets.len(), 3);
        for (i, packet) in packets.iter().enumerate() {
            let i = i as u8;
            assert_eq!(&packet[..9], &[0x4E, i, 3, i, 0x71, 0x00, 0x00, i + 1, 3]);
        }
        assert_eq!(packets[0].len(), 9 + 180);
        assert_eq!(packets[2].len(), 9 + 40);

        let body: Vec<u8> = packets.iter().flat_map(|p| p[9..].to_vec()).collect();
        assert_eq!(body, text.as_bytes());
    }

    #[test]
    fn text_ack_prefix_is_text_opcode() {
        // Historical captures list 0x04 as the text ack, but 0x04 is the
        // notification-config ack; the device echoes the 0x4E opcode.
        let cmd = send_text("hi").unwrap();
        assert_eq!(cmd.response_prefix(), &[0x4E]);
        assert_ne!(cmd.response_prefix(), &[0x04]);
    }

    #[test]
    fn oversized_text_is_rejected() {
        let text = "y".repeat(256 * TEXT_CHUNK_BYTES);
        assert!(matches!(
            send_text(&text),
            Err(CodecError::PayloadTooLarge { chunks: 256 })
        ));
    }

    #[test]
    fn notification_config_packets_are_opcode_total_index() {
        let json = "z".repeat(200);
        let cmd = set_notification_config(&json).unwrap();
        let packets = cmd.packets();
        assert_eq!(packets.len(), 2);
        assert_eq!(&packets[0][..3], &[0x04, 2, 0]);
        assert_eq!(&packets[1][..3], &[0x04, 2, 1]);
        assert_eq!(packets[0].len(), 3 + 180);
        assert_eq!(packets[1].len(), 3 + 20);
        assert_eq!(cmd.target(), Target::Left);
    }

    #[test]
    fn whitelist_uses_its_own_opcode_and_budget() {
        let json = "w".repeat(176);
        let cmd = set_whitelist(&json).unwrap();
        assert_eq!(cmd.packets().len(), 1);
        assert_eq!(&cmd.packets()[0][..3], &[0x4B, 1, 0]);
        assert_eq!(cmd.response_prefix(), &[0x4B]);

        let json = "w".repeat(177);
        assert_eq!(set_whitelist(&json).unwrap().packets().len(), 2);
    }

    #[test]
    fn bitmap_first_packet_carries_the_address_header() {
        let bmp = vec![0x5A; 500];
        let cmd = send_bitmap(&bmp).unwrap();
        let packets = cmd.packets();
        assert_eq!(packets.len(), 3);

        assert_eq!(&packets[0][..6], &[0x15, 0x00, 0x00, 0x1C, 0x00, 0x00]);
        assert_eq!(packets[0].len(), 6 + 194);
        assert_eq!(&packets[1][..2], &[0x15, 0x01]);
        assert_eq!(packets[1].len(), 2 + 194);
        assert_eq!(&packets[2][..2], &[0x15, 0x02]);
        assert_eq!(packets[2].len(), 2 + 112);

        let mut body = packets[0][6..].to_vec();
        body.extend_from_slice(&packets[1][2..]);
        body.extend_from_slice(&packets[2][2..]);
        assert_eq!(body, bmp);
    }

    #[test]
    fn oversized_bitmap_is_rejected() {
        let bmp = vec![0; 256 * BITMAP_CHUNK_BYTES];
        assert!(matches!(
            send_bitmap(&bmp),
            Err(CodecError::PayloadTooLarge { chunks: 256 })
        ));
    }

    #[test]
    fn bitmap_crc_covers_the_address_header_and_payload() {
        let bmp = vec![0x5A; 500];
        let cmd = bitmap_crc(&bmp);
        let packet = &cmd.packets()[0];
        assert_eq!(packet.len(), 5);
        assert_eq!(packet[0], 0x16);

        let mut covered = vec![0x00, 0x1C, 0x00, 0x00];
        covered.extend_from_slice(&bmp);
        let expected = crc32fast::hash(&covered);
        assert_eq!(&packet[1..], &expected.to_be_bytes());
    }

    #[test]
    fn fixed_byte_operations() {
        assert_eq!(set_silent_mode(true).packets(), &[vec![0x03, 0x01]]);
        assert_eq!(set_microphone_enabled(false).packets(), &[vec![0x0E, 0x00]]);
        assert_eq!(exit_app().packets(), &[vec![0x18]]);
        assert_eq!(end_bitmap_transfer().packets(), &[vec![0x20, 0x0D, 0x0E]]);
        assert_eq!(quick_restart().packets(), &[vec![0x23, 0x72]]);
        assert_eq!(set_wear_detection(true).packets(), &[vec![0x27, 0x01]]);
        assert_eq!(device_uptime().packets(), &[vec![0x37]]);
        assert_eq!(usage_report().packets(), &[vec![0x3E]]);
        assert_eq!(initialize().packets(), &[vec![0x4D, 0xFB]]);
    }

    #[test]
    fn every_packet_fits_the_transport_mtu() {
        use crate::command::TRANSPORT_MTU;

        let text = "t".repeat(250 * TEXT_CHUNK_BYTES);
        let bmp = vec![1; 250 * BITMAP_CHUNK_BYTES];
        for packets in [
            send_text(&text).unwrap().packets(),
            send_bitmap(&bmp).unwrap().packets(),
            set_notification_config(&"n".repeat(5000)).unwrap().packets(),
            set_whitelist(&"w".repeat(5000)).unwrap().packets(),
        ] {
            for packet in packets {
                assert!(packet.len() <= TRANSPORT_MTU);
            }
        }
    }
}
