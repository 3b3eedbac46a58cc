//! Integration tests across the PDU codec, the command session and the modem client

use crate::client::testing::fake_modem;
use crate::client::{
    CommandSession, ForwardNotifier, ListenerConfig, MessageListener, Modem, ModemConfig,
    SmsTransmitter,
};
use crate::codec;
use crate::datatypes::{Alphabet, encode_scts};
use crate::pdu::{InboundSms, OutboundSms, PduDecoder, PduEncoder, PduPart};
use chrono::{FixedOffset, TimeZone};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a service centre does with a submitted PDU: keep the destination
/// (now the originator), drop MR and VP, stamp it, keep the user data.
fn submit_to_deliver(submit: &[u8]) -> Vec<u8> {
    let mut i = 1 + submit[0] as usize;
    let first_octet = submit[i];
    i += 2; // first octet, TP-MR
    let address_len = 2 + (submit[i] as usize).div_ceil(2);
    let address = &submit[i..i + address_len];
    i += address_len;
    let (pid, dcs) = (submit[i], submit[i + 1]);
    i += 3; // PID, DCS, relative VP

    let timestamp = FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
        .unwrap();

    let mut deliver = vec![0x00, 0x04 | (first_octet & 0x40)];
    deliver.extend_from_slice(address);
    deliver.extend_from_slice(&[pid, dcs]);
    deliver.extend_from_slice(&encode_scts(&timestamp));
    deliver.extend_from_slice(&submit[i..]);
    deliver
}

fn deliver_all(parts: &[PduPart]) -> Vec<InboundSms> {
    parts
        .iter()
        .map(|part| {
            let line = codec::encode_hex(&submit_to_deliver(part.octets()));
            PduDecoder::decode(&line).unwrap()
        })
        .collect()
}

fn joined_text(received: &[InboundSms]) -> String {
    let mut parts: Vec<&InboundSms> = received.iter().collect();
    parts.sort_by_key(|sms| sms.concatenation.map(|c| c.sequence));
    parts.iter().map(|sms| sms.text.as_str()).collect()
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_long_gsm7_roundtrip() {
        let text = "Meet at [gate 4] at 10:00, bring €20 and {snacks}. ".repeat(8);
        let parts = PduEncoder::new().encode("+8613800138000", &text).unwrap();
        assert!(parts.len() > 1);

        let received = deliver_all(&parts);
        let reference = received[0].concatenation.unwrap().reference;
        for (i, sms) in received.iter().enumerate() {
            let concatenation = sms.concatenation.unwrap();
            assert_eq!(concatenation.reference, reference);
            assert_eq!(usize::from(concatenation.total), parts.len());
            assert_eq!(usize::from(concatenation.sequence), i + 1);
            assert_eq!(sms.sender.to_string(), "+8613800138000");
            assert_eq!(sms.data_coding.alphabet(), Alphabet::Gsm7);
        }
        assert_eq!(joined_text(&received), text);
    }

    #[test]
    fn test_boundary_between_single_and_concatenated() {
        let encoder = PduEncoder::new();

        let single = deliver_all(&encoder.encode("10086", &"x".repeat(160)).unwrap());
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].concatenation, None);
        assert_eq!(single[0].text.len(), 160);

        let split = deliver_all(&encoder.encode("10086", &"x".repeat(161)).unwrap());
        assert_eq!(split.len(), 2);
        let first = split[0].concatenation.unwrap();
        let second = split[1].concatenation.unwrap();
        assert_eq!((first.total, first.sequence), (2, 1));
        assert_eq!((second.total, second.sequence), (2, 2));
        assert_eq!(first.reference, second.reference);
        assert_eq!(joined_text(&split), "x".repeat(161));
    }

    #[test]
    fn test_one_non_gsm_character_forces_ucs2() {
        let text = format!("{}✓", "plain ascii ".repeat(10));
        let sms = OutboundSms::new("+8613800138000", text.clone());
        assert_eq!(sms.alphabet().unwrap(), Alphabet::Ucs2);

        let received = deliver_all(&PduEncoder::new().encode_sms(&sms).unwrap());
        assert_eq!(received.len(), 2, "121 UCS2 units need two parts");
        assert!(received.iter().all(|s| s.data_coding.alphabet() == Alphabet::Ucs2));
        assert_eq!(joined_text(&received), text);
    }

    #[test]
    fn test_number_format_survives_roundtrip() {
        let encoder = PduEncoder::new();
        let international = deliver_all(&encoder.encode("+8613800138000", "hi").unwrap());
        assert_eq!(international[0].sender.to_string(), "+8613800138000");

        let national = deliver_all(&encoder.encode("13800138000", "hi").unwrap());
        assert_eq!(national[0].sender.to_string(), "13800138000");
        assert!(!national[0].sender.is_international());
    }

    #[test]
    fn test_utc_instant_of_received_timestamp() {
        let received = deliver_all(&PduEncoder::new().encode("10086", "hi").unwrap());
        let utc = received[0].utc_timestamp();
        assert_eq!(utc.to_rfc3339(), "2025-03-14T01:26:53+00:00");
    }

    #[tokio::test]
    async fn test_send_then_receive_through_loopback_modem() {
        // The fake network delivers every submitted PDU back to the SIM.
        let mut inbox: Vec<String> = Vec::new();
        let mut next_reference = 0u8;
        let (stream, _modem) = fake_modem(move |command| {
            let reply = if command.starts_with("AT+CMGS=") {
                "\r\n> ".to_string()
            } else if let Some(hex) = command.strip_suffix('\u{1A}') {
                let submit = codec::decode_hex(hex).unwrap();
                inbox.push(codec::encode_hex(&submit_to_deliver(&submit)));
                next_reference += 1;
                format!("\r\n+CMGS: {next_reference}\r\n\r\nOK\r\n")
            } else if command.starts_with("AT+CMGL=0") {
                let mut listing = String::from("\r\n");
                for (index, pdu) in inbox.drain(..).enumerate() {
                    listing.push_str(&format!("+CMGL: {},0,,{}\r\n{}\r\n", index, pdu.len() / 2 - 1, pdu));
                }
                listing.push_str("\r\nOK\r\n");
                listing
            } else {
                "\r\nOK\r\n".to_string()
            };
            Some(reply)
        });

        let session = Arc::new(CommandSession::from_stream(stream));
        let modem = Modem::new(session.clone(), ModemConfig::default());
        let (sender, mut notifications) = mpsc::channel(8);
        let mut listener = MessageListener::new(
            session,
            ForwardNotifier::new(sender),
            ListenerConfig::default(),
        );

        let text = "The quick brown fox jumps over the lazy dog. ".repeat(5);
        let references = modem
            .send_sms(&OutboundSms::new("+8613800138000", text.clone()))
            .await
            .unwrap();
        assert_eq!(references, vec![1, 2]);

        let report = listener.poll_once().await.unwrap();
        assert_eq!(report.listed, 2);
        assert_eq!(report.dispatched, 1);

        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification.title, "new sms from +8613800138000");
        assert_eq!(
            notification.body,
            format!("{text},\nreceive time: 2025-03-14 09:26:53+08:00")
        );
    }
}
