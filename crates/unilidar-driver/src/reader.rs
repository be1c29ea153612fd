//! LiDAR Reader
//!
//! 单步驱动的解析状态机：每次 [`LidarReader::parse_step`] 最多处理一个帧，
//! 调用方自己决定在哪个线程、以什么频率推进。
//!
//! 读路径不阻塞：先解码已缓冲的字节，缓冲区内没有完整帧时才做一次非阻塞读取。
//! 完成的整圈点云发布到快照槽，其他线程通过 [`SnapshotReader`] 或 [`Handoff`] 读取。

use crate::assembler::{AppendOutcome, AssemblyError, CloudAssembler, ReaderPhase};
use crate::config::ReaderConfig;
use crate::error::DriverError;
use crate::handoff::{BoundaryAllocator, CAllocator, Handoff};
use crate::metrics::ReaderMetrics;
use crate::point::{ImuSample, PointCloud, VersionInfo};
use crate::snapshot::{CloudPublisher, SnapshotReader};
use crate::version::SDK_VERSION;
use bytes::BytesMut;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace, warn};
use unilidar_protocol::{
    AckPacket, DecoderStats, Frame, FrameDecoder, ImuPacket, MAX_FRAME_LEN, MessageKind,
    PointBatch, UserCommand, VersionPacket, WorkingMode,
};
use unilidar_serial::Transport;

/// 单次非阻塞读取的最大字节数
const READ_CHUNK: usize = 4096;

/// `parse_step` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub enum MessageTag {
    /// 没有完整帧可处理
    NoMessage = 0,
    /// 点云批次已处理（或被丢弃），本圈尚未完成
    PointBatchPartial = 1,
    /// 一圈完成并已发布
    PointCloudComplete = 2,
    /// IMU 采样
    ImuSample = 3,
    /// 版本信息
    VersionInfo = 4,
    /// 命令应答
    CommandAck = 5,
    /// 未知类型帧
    Unknown = 6,
    /// 损坏帧或负载非法
    DecodeError = 7,
}

impl MessageTag {
    /// 从 u8 转换，无效值视为 NoMessage
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::PointBatchPartial,
            2 => Self::PointCloudComplete,
            3 => Self::ImuSample,
            4 => Self::VersionInfo,
            5 => Self::CommandAck,
            6 => Self::Unknown,
            7 => Self::DecodeError,
            _ => Self::NoMessage,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// LiDAR Reader
///
/// `parse_step` 需要 `&mut self`，解析天然串行；快照读取只经过共享的发布槽。
pub struct LidarReader<T: Transport> {
    transport: T,
    config: ReaderConfig,
    decoder: FrameDecoder,
    buffer: BytesMut,
    read_buf: Box<[u8]>,
    assembler: CloudAssembler,
    publisher: CloudPublisher,
    metrics: Arc<ReaderMetrics>,
    last_imu: Option<ImuSample>,
    last_ack: Option<AckPacket>,
    version: Option<VersionInfo>,
    working_mode: Option<WorkingMode>,
}

impl<T: Transport> LidarReader<T> {
    /// 在已打开的传输上创建 Reader
    ///
    /// 配置非法时返回 `DriverError::InvalidConfig`。
    pub fn new(transport: T, config: ReaderConfig) -> Result<Self, DriverError> {
        config.validate()?;
        info!(
            "LiDAR reader created (max {} points per revolution)",
            config.max_points_per_revolution
        );
        Ok(Self {
            transport,
            decoder: FrameDecoder::new(),
            buffer: BytesMut::with_capacity(MAX_FRAME_LEN + READ_CHUNK),
            read_buf: vec![0u8; READ_CHUNK].into_boxed_slice(),
            assembler: CloudAssembler::new(&config),
            publisher: CloudPublisher::new(),
            metrics: Arc::new(ReaderMetrics::new()),
            last_imu: None,
            last_ack: None,
            version: None,
            working_mode: None,
            config,
        })
    }

    /// 推进一步
    ///
    /// 最多产出一个解码结果。传输读取失败会被记录并计数，返回 `NoMessage`。
    pub fn parse_step(&mut self) -> MessageTag {
        let decoded = match self.decoder.decode(&mut self.buffer) {
            Ok(None) => {
                if self.fill_buffer() == 0 {
                    return MessageTag::NoMessage;
                }
                self.decoder.decode(&mut self.buffer)
            },
            other => other,
        };

        match decoded {
            Ok(Some(frame)) => {
                self.metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
                self.dispatch(frame)
            },
            Ok(None) => MessageTag::NoMessage,
            Err(e) => {
                self.metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
                debug!("Corrupt frame: {}", e);
                MessageTag::DecodeError
            },
        }
    }

    /// 一次非阻塞读取，返回新增字节数
    fn fill_buffer(&mut self) -> usize {
        match self.transport.read(&mut self.read_buf) {
            Ok(n) => {
                self.buffer.extend_from_slice(&self.read_buf[..n]);
                n
            },
            Err(e) => {
                let count = self.metrics.transport_errors.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Transport read failed ({} so far): {}", count, e);
                0
            },
        }
    }

    fn dispatch(&mut self, frame: Frame) -> MessageTag {
        match frame.kind {
            MessageKind::PointBatch => self.handle_point_batch(&frame),
            MessageKind::Imu => match ImuPacket::decode(frame.payload()) {
                Ok(packet) => {
                    self.last_imu = Some(packet.into());
                    self.metrics.imu_samples.fetch_add(1, Ordering::Relaxed);
                    MessageTag::ImuSample
                },
                Err(e) => self.payload_error(&frame, e),
            },
            MessageKind::Version => match VersionPacket::decode(frame.payload()) {
                Ok(packet) => {
                    let info = VersionInfo::from(packet);
                    info!(
                        "LiDAR version: hardware {}, firmware {}, date {}",
                        info.hardware, info.firmware, info.date
                    );
                    self.version = Some(info);
                    self.metrics.version_messages.fetch_add(1, Ordering::Relaxed);
                    MessageTag::VersionInfo
                },
                Err(e) => self.payload_error(&frame, e),
            },
            MessageKind::Ack => match AckPacket::decode(frame.payload()) {
                Ok(ack) => {
                    if !ack.is_success() {
                        warn!(
                            "Command {} (value {}) rejected with status {}",
                            ack.cmd_type, ack.cmd_value, ack.status
                        );
                    }
                    self.last_ack = Some(ack);
                    self.metrics.command_acks.fetch_add(1, Ordering::Relaxed);
                    MessageTag::CommandAck
                },
                Err(e) => self.payload_error(&frame, e),
            },
            MessageKind::Unknown(packet_type) => {
                self.metrics.unknown_frames.fetch_add(1, Ordering::Relaxed);
                trace!("Ignoring frame with unknown packet type {}", packet_type);
                MessageTag::Unknown
            },
        }
    }

    fn payload_error(&self, frame: &Frame, error: unilidar_protocol::ProtocolError) -> MessageTag {
        self.metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
        warn!("Invalid payload in packet type {}: {}", frame.packet_type, error);
        MessageTag::DecodeError
    }

    fn handle_point_batch(&mut self, frame: &Frame) -> MessageTag {
        let batch = match PointBatch::decode(frame.payload()) {
            Ok(batch) => batch,
            Err(e) => return self.payload_error(frame, e),
        };
        self.metrics.point_batches.fetch_add(1, Ordering::Relaxed);

        if batch.is_revolution_start() {
            match self.assembler.begin_revolution(&batch) {
                Ok(Some(abandoned)) => {
                    self.metrics.revolutions_abandoned.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Revolution {} abandoned by start of revolution {}",
                        abandoned, batch.scan_id
                    );
                },
                Ok(None) => {},
                Err(e) => return self.drop_batch(e),
            }
        }

        match self.assembler.append_points(&batch) {
            Ok(AppendOutcome::Partial) => MessageTag::PointBatchPartial,
            Ok(AppendOutcome::Complete) => {
                self.publish_completed();
                MessageTag::PointCloudComplete
            },
            Err(e) => self.drop_batch(e),
        }
    }

    fn drop_batch(&self, error: AssemblyError) -> MessageTag {
        self.metrics.record_assembly_error(&error);
        debug!("Dropping point batch: {}", error);
        MessageTag::PointBatchPartial
    }

    fn publish_completed(&mut self) {
        let Some(cloud) = self.assembler.finalize() else {
            return;
        };
        trace!("Revolution {} complete with {} points", cloud.scan_id, cloud.len());
        self.metrics.revolutions_completed.fetch_add(1, Ordering::Relaxed);
        if let Some(recycled) = self.publisher.publish(cloud) {
            self.assembler.recycle(recycled);
        }
    }

    /// 回到 Idle
    ///
    /// 丢弃未完成的圈和尚未解码的字节。已发布的最新一圈保持可读，传输不受影响。
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.buffer.clear();
        info!("LiDAR reader reset");
    }

    /// 下发用户命令
    pub fn send_command(&mut self, command: UserCommand) -> Result<(), DriverError> {
        let frame = command.to_frame()?;
        self.transport.write_all(&frame)?;
        debug!(
            "Sent command {:?} (value {})",
            command.cmd_type, command.cmd_value
        );
        Ok(())
    }

    /// 切换工作模式
    pub fn set_working_mode(&mut self, mode: WorkingMode) -> Result<(), DriverError> {
        self.send_command(UserCommand::set_working_mode(mode))?;
        self.working_mode = Some(mode);
        info!("Working mode set to {:?}", mode);
        Ok(())
    }

    /// 请求设备上报版本信息（应答通过 `parse_step` 到达）
    pub fn request_version(&mut self) -> Result<(), DriverError> {
        self.send_command(UserCommand::request_version())
    }

    /// 请求设备复位
    pub fn reset_device(&mut self) -> Result<(), DriverError> {
        self.send_command(UserCommand::reset())
    }

    pub fn phase(&self) -> ReaderPhase {
        self.assembler.phase()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 最近一次设置的工作模式（尚未设置过时为 `None`）
    pub fn working_mode(&self) -> Option<WorkingMode> {
        self.working_mode
    }

    pub fn version_info(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    /// 固件版本（收到版本应答之前为 `None`）
    pub fn firmware_version(&self) -> Option<&str> {
        self.version.as_ref().map(|v| v.firmware.as_str())
    }

    pub fn hardware_version(&self) -> Option<&str> {
        self.version.as_ref().map(|v| v.hardware.as_str())
    }

    pub fn sdk_version(&self) -> &'static str {
        SDK_VERSION
    }

    pub fn last_imu(&self) -> Option<&ImuSample> {
        self.last_imu.as_ref()
    }

    pub fn last_ack(&self) -> Option<&AckPacket> {
        self.last_ack.as_ref()
    }

    /// 最新完成的一圈
    pub fn latest_cloud(&self) -> Option<Arc<PointCloud>> {
        self.publisher.latest()
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    /// 使用 C 分配器的快照交接
    pub fn handoff(&self) -> Handoff<CAllocator> {
        self.handoff_with(CAllocator)
    }

    /// 使用自定义分配器的快照交接
    pub fn handoff_with<A: BoundaryAllocator>(&self, allocator: A) -> Handoff<A> {
        Handoff::new(self.publisher.reader(), allocator, self.metrics.clone())
    }

    pub fn metrics(&self) -> &Arc<ReaderMetrics> {
        &self.metrics
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// 尚未解码的缓冲字节数
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> std::fmt::Debug for LidarReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LidarReader")
            .field("phase", &self.phase())
            .field("buffered", &self.buffer.len())
            .field("working_mode", &self.working_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unilidar_protocol::{RawPoint, encode_frame};
    use unilidar_serial::{MockDevice, MockTransport, SerialDeviceErrorKind};

    fn reader() -> (LidarReader<MockTransport>, MockDevice) {
        let (transport, device) = MockTransport::new();
        (LidarReader::new(transport, ReaderConfig::default()).unwrap(), device)
    }

    fn batch_frame(scan_id: u32, total: u32, first_index: u32, count: u32) -> Vec<u8> {
        PointBatch {
            scan_id,
            stamp: 0.0,
            ring_count: 1,
            points_per_revolution: total,
            first_index,
            points: (0..count)
                .map(|i| RawPoint {
                    azimuth: i as u16,
                    range: 1000,
                    intensity: 1,
                    ..Default::default()
                })
                .collect(),
        }
        .to_frame()
        .unwrap()
        .to_vec()
    }

    #[test]
    fn test_message_tag_round_trip() {
        for v in 0..8u8 {
            assert_eq!(MessageTag::from_u8(v).as_u8(), v);
        }
        assert_eq!(MessageTag::from_u8(99), MessageTag::NoMessage);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (transport, _device) = MockTransport::new();
        let config = ReaderConfig {
            range_scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            LidarReader::new(transport, config),
            Err(DriverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_idle_line_yields_no_message() {
        let (mut reader, _device) = reader();
        assert_eq!(reader.parse_step(), MessageTag::NoMessage);
        assert_eq!(reader.phase(), ReaderPhase::Idle);
    }

    #[test]
    fn test_one_frame_per_step() {
        let (mut reader, device) = reader();
        device.feed(&batch_frame(1, 4, 0, 2));
        device.feed(&batch_frame(1, 4, 2, 2));

        assert_eq!(reader.parse_step(), MessageTag::PointBatchPartial);
        // 第二帧已在缓冲区中，不需要再读取
        assert_eq!(device.pending(), 0);
        assert_eq!(reader.parse_step(), MessageTag::PointCloudComplete);
        assert_eq!(reader.parse_step(), MessageTag::NoMessage);

        let cloud = reader.latest_cloud().unwrap();
        assert_eq!(cloud.scan_id, 1);
        assert_eq!(cloud.len(), 4);
        assert_eq!(reader.phase(), ReaderPhase::Complete);
    }

    #[test]
    fn test_imu_version_ack_unknown() {
        let (mut reader, device) = reader();
        device.feed(
            &ImuPacket {
                seq: 3,
                ..Default::default()
            }
            .to_frame()
            .unwrap(),
        );
        device.feed(
            &VersionPacket {
                hardware: [1, 0, 0, 0],
                firmware: [2, 0, 1, 7],
                date: *b"20231001",
            }
            .to_frame()
            .unwrap(),
        );
        device.feed(
            &AckPacket {
                packet_type: 100,
                cmd_type: 2,
                cmd_value: 1,
                status: 0,
            }
            .to_frame()
            .unwrap(),
        );
        device.feed(&encode_frame(250, &[1, 2, 3]).unwrap());

        assert_eq!(reader.parse_step(), MessageTag::ImuSample);
        assert_eq!(reader.last_imu().unwrap().seq, 3);
        assert_eq!(reader.parse_step(), MessageTag::VersionInfo);
        assert_eq!(reader.firmware_version(), Some("2.0.1.7"));
        assert_eq!(reader.hardware_version(), Some("1.0.0.0"));
        assert_eq!(reader.parse_step(), MessageTag::CommandAck);
        assert!(reader.last_ack().unwrap().is_success());
        assert_eq!(reader.parse_step(), MessageTag::Unknown);

        let m = reader.metrics().snapshot();
        assert_eq!(m.frames_decoded, 4);
        assert_eq!(m.imu_samples, 1);
        assert_eq!(m.unknown_frames, 1);
    }

    #[test]
    fn test_bad_batch_payload_is_decode_error() {
        let (mut reader, device) = reader();
        // 类型是点云批次，但负载长度不足
        device.feed(&encode_frame(102, &[0u8; 10]).unwrap());
        assert_eq!(reader.parse_step(), MessageTag::DecodeError);
        assert_eq!(reader.metrics().snapshot().decode_errors, 1);
    }

    #[test]
    fn test_mismatched_batch_is_counted() {
        let (mut reader, device) = reader();
        device.feed(&batch_frame(5, 4, 0, 2));
        device.feed(&batch_frame(6, 4, 2, 2));

        assert_eq!(reader.parse_step(), MessageTag::PointBatchPartial);
        assert_eq!(reader.parse_step(), MessageTag::PointBatchPartial);
        assert_eq!(reader.metrics().snapshot().scan_id_mismatches, 1);
        assert!(reader.latest_cloud().is_none());
    }

    #[test]
    fn test_transport_error_is_no_message() {
        let (mut reader, device) = reader();
        device.fail_next_read(SerialDeviceErrorKind::Busy);
        assert_eq!(reader.parse_step(), MessageTag::NoMessage);
        assert_eq!(reader.metrics().snapshot().transport_errors, 1);
    }

    #[test]
    fn test_reset_keeps_published_cloud() {
        let (mut reader, device) = reader();
        device.feed(&batch_frame(1, 2, 0, 2));
        assert_eq!(reader.parse_step(), MessageTag::PointCloudComplete);

        let partial = batch_frame(2, 4, 0, 2);
        device.feed(&partial);
        assert_eq!(reader.parse_step(), MessageTag::PointBatchPartial);
        // 半个帧留在缓冲区
        device.feed(&batch_frame(2, 4, 2, 2)[..20]);
        assert_eq!(reader.parse_step(), MessageTag::NoMessage);
        assert!(reader.buffered_len() > 0);

        reader.reset();
        assert_eq!(reader.phase(), ReaderPhase::Idle);
        assert_eq!(reader.buffered_len(), 0);
        assert_eq!(reader.latest_cloud().unwrap().scan_id, 1);
    }

    #[test]
    fn test_set_working_mode_writes_command() {
        let (mut reader, device) = reader();
        assert_eq!(reader.working_mode(), None);
        reader.set_working_mode(WorkingMode::Standby).unwrap();
        assert_eq!(reader.working_mode(), Some(WorkingMode::Standby));

        let written = device.take_written();
        assert_eq!(
            written,
            UserCommand::set_working_mode(WorkingMode::Standby)
                .to_frame()
                .unwrap()
                .to_vec()
        );
    }

    #[test]
    fn test_command_on_closed_line_fails() {
        let (mut reader, device) = reader();
        device.disconnect();
        assert!(matches!(
            reader.request_version(),
            Err(DriverError::Serial(unilidar_serial::SerialError::Closed))
        ));
        assert_eq!(reader.working_mode(), None);
        assert!(reader.set_working_mode(WorkingMode::Normal).is_err());
        assert_eq!(reader.working_mode(), None);
    }
}
