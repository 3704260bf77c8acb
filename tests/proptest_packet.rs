use proptest::prelude::*;

use ndhcpd::packet::DHCP_PACKET_SIZE;
use ndhcpd::{DhcpPacket, OptionCode};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const DHCP_FIXED_HEADER_SIZE: usize = 240;

fn valid_header() -> Vec<u8> {
    let mut packet = vec![0u8; DHCP_FIXED_HEADER_SIZE];
    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
    packet
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(data: Vec<u8>) {
        let _ = DhcpPacket::decode(&data);
    }

    #[test]
    fn decode_never_panics_on_valid_header_with_random_options(
        options_data in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut packet = valid_header();
        packet.extend_from_slice(&options_data);
        let _ = DhcpPacket::decode(&packet);
    }

    #[test]
    fn decode_never_panics_on_corrupted_header(
        corrupted_bytes in prop::collection::vec(any::<u8>(), 240..600),
        corruption_indices in prop::collection::vec(0usize..240, 1..10),
        corruption_values in prop::collection::vec(any::<u8>(), 1..10)
    ) {
        let mut packet = corrupted_bytes;
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
        for (index, value) in corruption_indices.iter().zip(corruption_values.iter()) {
            if *index < packet.len() {
                packet[*index] = *value;
            }
        }
        let _ = DhcpPacket::decode(&packet);
    }

    #[test]
    fn option_scan_never_panics_on_random_option_lengths(
        option_code in 1u8..254,
        option_length in any::<u8>(),
        option_data in prop::collection::vec(any::<u8>(), 0..256),
        wanted in prop::sample::select(vec![
            OptionCode::Pad,
            OptionCode::SubnetMask,
            OptionCode::RequestedIpAddress,
            OptionCode::LeaseTime,
            OptionCode::MessageType,
            OptionCode::ServerIdentifier,
            OptionCode::End,
        ])
    ) {
        let mut packet = valid_header();
        packet.push(option_code);
        packet.push(option_length);
        let actual_len = (option_length as usize).min(option_data.len());
        packet.extend_from_slice(&option_data[..actual_len]);
        packet.push(255);

        if let Ok(decoded) = DhcpPacket::decode(&packet) {
            // A truncated option must fail closed, never read out of
            // bounds.
            let _ = decoded.find_option(wanted);
            let _ = decoded.option_value(wanted);
            let _ = decoded.message_type();
            let _ = decoded.requested_ip();
            let _ = decoded.server_identifier();
        }
    }

    #[test]
    fn roundtrip_encode_decode_preserves_data(
        xid in any::<u32>(),
        secs in any::<u16>(),
        flags in any::<u16>(),
        ciaddr in any::<[u8; 4]>(),
        yiaddr in any::<[u8; 4]>(),
        siaddr in any::<[u8; 4]>(),
        giaddr in any::<[u8; 4]>(),
        chaddr in any::<[u8; 16]>(),
    ) {
        let mut packet = valid_header();
        packet[4..8].copy_from_slice(&xid.to_be_bytes());
        packet[8..10].copy_from_slice(&secs.to_be_bytes());
        packet[10..12].copy_from_slice(&flags.to_be_bytes());
        packet[12..16].copy_from_slice(&ciaddr);
        packet[16..20].copy_from_slice(&yiaddr);
        packet[20..24].copy_from_slice(&siaddr);
        packet[24..28].copy_from_slice(&giaddr);
        packet[28..44].copy_from_slice(&chaddr);
        packet.push(255);

        let decoded = DhcpPacket::decode(&packet).unwrap();
        let encoded = decoded.encode();
        prop_assert_eq!(encoded.len(), DHCP_PACKET_SIZE);

        let redecoded = DhcpPacket::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.xid, redecoded.xid);
        prop_assert_eq!(decoded.secs, redecoded.secs);
        prop_assert_eq!(decoded.flags, redecoded.flags);
        prop_assert_eq!(decoded.ciaddr, redecoded.ciaddr);
        prop_assert_eq!(decoded.yiaddr, redecoded.yiaddr);
        prop_assert_eq!(decoded.siaddr, redecoded.siaddr);
        prop_assert_eq!(decoded.giaddr, redecoded.giaddr);
        prop_assert_eq!(decoded.chaddr, redecoded.chaddr);
        prop_assert_eq!(&decoded.options[..], &redecoded.options[..]);
    }

    #[test]
    fn short_packets_always_rejected(
        data in prop::collection::vec(any::<u8>(), 0..240)
    ) {
        let result = DhcpPacket::decode(&data);
        prop_assert!(result.is_err());
    }

    #[test]
    fn bad_magic_cookie_always_rejected(
        cookie in any::<[u8; 4]>()
    ) {
        prop_assume!(cookie != DHCP_MAGIC_COOKIE);

        let mut packet = valid_header();
        packet[236..240].copy_from_slice(&cookie);
        packet.push(255);

        let result = DhcpPacket::decode(&packet);
        prop_assert!(result.is_err());
    }

    #[test]
    fn non_ethernet_hardware_always_rejected(
        htype in any::<u8>(),
        hlen in any::<u8>()
    ) {
        prop_assume!(htype != 1 || hlen != 6);

        let mut packet = valid_header();
        packet[1] = htype;
        packet[2] = hlen;
        packet.push(255);

        let result = DhcpPacket::decode(&packet);
        prop_assert!(result.is_err());
    }

    #[test]
    fn non_bootrequest_always_rejected(
        op in 2u8..=255
    ) {
        let mut packet = valid_header();
        packet[0] = op;
        packet.push(255);

        let result = DhcpPacket::decode(&packet);
        prop_assert!(result.is_err());
    }

    #[test]
    fn added_option_is_found_with_the_same_value(
        value in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        let mut packet = DhcpPacket::default();
        packet.add_option(OptionCode::SubnetMask, &value).unwrap();

        prop_assert_eq!(
            packet.option_value(OptionCode::SubnetMask),
            Some(&value[..])
        );
        prop_assert!(packet.find_option(OptionCode::End).is_some());
    }
}
