//! 帧编解码
//!
//! 解码器工作在调用方持有的 `BytesMut` 上：调用方把串口读到的字节追加进去，
//! 然后反复调用 [`FrameDecoder::decode`]，每次最多产出一个帧。
//!
//! # 解码结果
//!
//! - `Ok(Some(frame))`: 完整且校验通过的帧（已从缓冲区移除）
//! - `Ok(None)`: 数据不足一帧，等待更多字节（不是错误）
//! - `Err(e)`: 找到了帧头，但帧损坏（长度非法、帧尾错误、类型校验失败、CRC 不匹配）
//!
//! # 重同步
//!
//! 损坏帧只丢弃帧头的第一个字节，下一次调用会重新向前扫描帧头。
//! 这样即便负载中恰好出现帧头序列（伪同步），也不会吞掉后面的有效帧。
//! 解码决策只取决于缓冲区内容，与字节到达的分片方式无关。
//!
//! 长度字段在帧尾到达之前无法校验。若它被损坏成一个仍在合法范围内的较大值，
//! 解码器会一直返回 `Ok(None)`，直到缓冲区攒够声明的长度才判定损坏并重同步；
//! 在此之前，排在它后面的有效帧也会被压住。链路空闲时这最多延迟
//! [`MAX_FRAME_LEN`] 字节，后续数据到达后即可恢复。

use crate::constants::*;
use crate::{Frame, MessageKind, ProtocolError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

/// 解码器诊断计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// 成功解码的帧数
    pub frames_decoded: u64,
    /// 损坏帧数
    pub corrupt_frames: u64,
    /// 因同步/损坏被丢弃的字节数
    pub bytes_discarded: u64,
}

/// 帧解码器
///
/// 自身只保存诊断计数，字节缓冲区由调用方持有。
#[derive(Debug, Default)]
pub struct FrameDecoder {
    stats: DecoderStats,
}

impl FrameDecoder {
    /// 创建新的解码器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取诊断计数
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// 从缓冲区解码下一个帧
    ///
    /// 参见模块文档中的返回值约定。
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if !self.sync(src) {
            return Ok(None);
        }

        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let packet_type = read_u32_le(&src[4..8]);
        let packet_size = read_u32_le(&src[8..12]) as usize;

        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&packet_size) {
            self.reject(src);
            return Err(ProtocolError::InvalidFrameSize { size: packet_size });
        }

        if src.len() < packet_size {
            return Ok(None);
        }

        let body_end = packet_size - TAIL_LEN;
        let tail = &src[body_end..packet_size];

        if tail[10..12] != FRAME_TAIL {
            self.reject(src);
            return Err(ProtocolError::InvalidTail);
        }

        let check = read_u32_le(&tail[4..8]);
        if check != packet_type {
            self.reject(src);
            return Err(ProtocolError::TypeCheckMismatch { packet_type, check });
        }

        let expected = read_u32_le(&tail[0..4]);
        let actual = crc32fast::hash(&src[..body_end]);
        if expected != actual {
            self.reject(src);
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let raw = src.split_to(packet_size).freeze();
        let payload = raw.slice(HEADER_LEN..body_end);
        self.stats.frames_decoded += 1;

        trace!(packet_type, len = payload.len(), "frame decoded");

        Ok(Some(Frame {
            packet_type,
            kind: MessageKind::from_packet_type(packet_type),
            payload,
        }))
    }

    /// 把缓冲区对齐到帧头
    ///
    /// 返回 `true` 表示缓冲区以完整帧头开始。找不到帧头时丢弃无用字节，
    /// 但保留末尾可能是帧头前缀的部分。
    fn sync(&mut self, src: &mut BytesMut) -> bool {
        match src.windows(FRAME_HEADER.len()).position(|w| w == FRAME_HEADER) {
            Some(0) => true,
            Some(pos) => {
                trace!(discarded = pos, "discarding bytes before frame header");
                self.discard(src, pos);
                true
            },
            None => {
                let keep = partial_header_len(src);
                let discard = src.len() - keep;
                if discard > 0 {
                    self.discard(src, discard);
                }
                false
            },
        }
    }

    /// 损坏帧：丢弃一个字节，下次调用重新扫描帧头
    fn reject(&mut self, src: &mut BytesMut) {
        self.stats.corrupt_frames += 1;
        self.discard(src, 1);
        warn!(
            corrupt_frames = self.stats.corrupt_frames,
            "corrupt frame, resynchronizing"
        );
    }

    fn discard(&mut self, src: &mut BytesMut, count: usize) {
        src.advance(count);
        self.stats.bytes_discarded += count as u64;
    }
}

/// 缓冲区末尾与帧头前缀重合的长度（0..=3）
fn partial_header_len(src: &[u8]) -> usize {
    (1..FRAME_HEADER.len())
        .rev()
        .find(|&k| src.len() >= k && src[src.len() - k..] == FRAME_HEADER[..k])
        .unwrap_or(0)
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// 编码一个完整帧（帧头 + 负载 + 帧尾）
///
/// # 错误
/// - `PayloadTooLarge`: 负载超过 [`MAX_PAYLOAD_LEN`]
pub fn encode_frame(packet_type: u32, payload: &[u8]) -> Result<Bytes, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let packet_size = MIN_FRAME_LEN + payload.len();
    let mut buf = BytesMut::with_capacity(packet_size);
    buf.put_slice(&FRAME_HEADER);
    buf.put_u32_le(packet_type);
    buf.put_u32_le(packet_size as u32);
    buf.put_slice(payload);

    let crc = crc32fast::hash(&buf);
    buf.put_u32_le(crc);
    buf.put_u32_le(packet_type);
    buf.put_slice(&[0, 0]);
    buf.put_slice(&FRAME_TAIL);

    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut FrameDecoder, buf: &mut BytesMut) -> Vec<Result<Frame, ProtocolError>> {
        let mut out = Vec::new();
        loop {
            match decoder.decode(buf) {
                Ok(Some(frame)) => out.push(Ok(frame)),
                Ok(None) => break,
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(104, &[1, 2, 3]).unwrap();
        assert_eq!(frame.len(), 27);
        assert_eq!(&frame[..4], &FRAME_HEADER);
        assert_eq!(&frame[4..8], &104u32.to_le_bytes());
        assert_eq!(&frame[8..12], &27u32.to_le_bytes());
        assert_eq!(&frame[12..15], &[1, 2, 3]);
        assert_eq!(&frame[15..19], &crc32fast::hash(&frame[..15]).to_le_bytes());
        assert_eq!(&frame[19..23], &104u32.to_le_bytes());
        assert_eq!(&frame[25..27], &FRAME_TAIL);
    }

    #[test]
    fn test_encode_frame_payload_too_large() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let err = encode_frame(102, &payload).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_decode_single_frame() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&encode_frame(101, &[9; 16]).unwrap()[..]);

        let frame = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.packet_type, 101);
        assert_eq!(frame.kind, MessageKind::Ack);
        assert_eq!(frame.payload(), &[9; 16]);
        assert!(buf.is_empty());
        assert_eq!(decoder.stats().frames_decoded, 1);
    }

    #[test]
    fn test_decode_incomplete_is_not_error() {
        let mut decoder = FrameDecoder::new();
        let encoded = encode_frame(104, &[0; 52]).unwrap();
        let mut buf = BytesMut::from(&encoded[..30]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        // 已缓冲的字节保持不变
        assert_eq!(buf.len(), 30);

        buf.extend_from_slice(&encoded[30..]);
        assert!(decoder.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_decode_skips_garbage_before_header() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&[0x11, 0x22, 0x55, 0x33][..]);
        buf.extend_from_slice(&encode_frame(105, &[0; 16]).unwrap());

        let frame = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.kind, MessageKind::Version);
        assert_eq!(decoder.stats().bytes_discarded, 4);
    }

    #[test]
    fn test_decode_keeps_partial_header_suffix() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&[0x01, 0x02, 0x55, 0xAA, 0x05][..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], &[0x55, 0xAA, 0x05]);
    }

    #[test]
    fn test_decode_checksum_mismatch_then_resync() {
        let mut decoder = FrameDecoder::new();
        let mut corrupt = encode_frame(102, &[7; 40]).unwrap().to_vec();
        let crc_pos = corrupt.len() - TAIL_LEN;
        corrupt[crc_pos] ^= 0xFF;

        let mut buf = BytesMut::from(&corrupt[..]);
        buf.extend_from_slice(&encode_frame(104, &[1; 52]).unwrap());

        let results = decode_all(&mut decoder, &mut buf);
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
        let frame = results[1].as_ref().unwrap();
        assert_eq!(frame.kind, MessageKind::Imu);
        assert_eq!(decoder.stats().corrupt_frames, 1);
    }

    #[test]
    fn test_decode_invalid_frame_size() {
        let mut decoder = FrameDecoder::new();
        let mut raw = encode_frame(101, &[0; 16]).unwrap().to_vec();
        raw[8..12].copy_from_slice(&(MAX_FRAME_LEN as u32 + 1).to_le_bytes());
        let mut buf = BytesMut::from(&raw[..]);

        let err = decoder.decode(&mut buf).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidFrameSize {
                size: MAX_FRAME_LEN + 1
            }
        );
        // 只丢弃一个字节
        assert_eq!(buf.len(), raw.len() - 1);
    }

    #[test]
    fn test_inflated_length_holds_back_until_enough_bytes() {
        let mut decoder = FrameDecoder::new();
        let mut inflated = encode_frame(101, &[0; 16]).unwrap().to_vec();
        inflated[8..12].copy_from_slice(&4000u32.to_le_bytes());
        let valid = encode_frame(104, &[3; 52]).unwrap();

        let mut buf = BytesMut::from(&inflated[..]);
        buf.extend_from_slice(&valid);
        // 声明长度尚未到齐，后面的有效帧暂时出不来
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&vec![0u8; 4000]);
        let results = decode_all(&mut decoder, &mut buf);
        assert!(results[0].as_ref().is_err_and(|e| e.is_corrupt_frame()));
        let frames: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, MessageKind::Imu);
        assert_eq!(frames[0].payload(), &[3; 52]);
    }

    #[test]
    fn test_decode_invalid_tail() {
        let mut decoder = FrameDecoder::new();
        let mut raw = encode_frame(101, &[0; 16]).unwrap().to_vec();
        let last = raw.len() - 1;
        raw[last] = 0xEE;
        let mut buf = BytesMut::from(&raw[..]);

        assert_eq!(decoder.decode(&mut buf).unwrap_err(), ProtocolError::InvalidTail);
    }

    #[test]
    fn test_decode_type_check_mismatch() {
        let mut decoder = FrameDecoder::new();
        let mut raw = encode_frame(101, &[0; 16]).unwrap().to_vec();
        let check_pos = raw.len() - 8;
        raw[check_pos..check_pos + 4].copy_from_slice(&999u32.to_le_bytes());
        let mut buf = BytesMut::from(&raw[..]);

        assert_eq!(
            decoder.decode(&mut buf).unwrap_err(),
            ProtocolError::TypeCheckMismatch {
                packet_type: 101,
                check: 999
            }
        );
    }

    #[test]
    fn test_decode_unknown_kind_is_reported() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&encode_frame(106, &[1, 2]).unwrap()[..]);

        let frame = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.kind, MessageKind::Unknown(106));
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::new();
        for t in [101u32, 104, 105] {
            buf.extend_from_slice(&encode_frame(t, &[0; 4]).unwrap());
        }

        let kinds: Vec<_> = decode_all(&mut decoder, &mut buf)
            .into_iter()
            .map(|r| r.unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![MessageKind::Ack, MessageKind::Imu, MessageKind::Version]
        );
    }

    #[test]
    fn test_partial_header_len() {
        assert_eq!(partial_header_len(&[]), 0);
        assert_eq!(partial_header_len(&[0x55]), 1);
        assert_eq!(partial_header_len(&[0x00, 0x55, 0xAA]), 2);
        assert_eq!(partial_header_len(&[0x55, 0xAA, 0x05]), 3);
        assert_eq!(partial_header_len(&[0x55, 0xAA, 0x06]), 0);
    }
}
