//! C ABI
//!
//! 所有入口都通过不透明句柄 [`UnilidarHandle`] 访问 Reader。句柄在全局注册表中登记，
//! 每次调用前先查表：空指针、已销毁或伪造的句柄都只会得到错误码，不会被解引用。
//!
//! 解析（`unilidar_parse_step`）和快照（`unilidar_take_snapshot`）持有不同的锁，
//! 可以在两个线程上同时调用。
//!
//! 快照缓冲区由 `malloc` 分配，必须通过 `unilidar_release_snapshot_buffer`
//! （或直接 `free`）恰好释放一次。

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};
use unilidar_driver::{
    BoundarySnapshot, CAllocator, DriverError, Handoff, LidarReader, MessageTag, Point,
    ReaderConfig, SDK_VERSION, release_snapshot_buffer, version::copy_nul_terminated,
};
use unilidar_protocol::WorkingMode;
use unilidar_serial::Transport;

/// C 侧看到的状态码
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnilidarStatus {
    Ok = 0,
    /// 空指针、已销毁或未知的句柄
    InvalidHandle = -1,
    /// 参数非法（空指针、非 UTF-8 字符串、未知工作模式）
    InvalidArgument = -2,
    /// 串口打开或写入失败
    TransportFailure = -3,
    /// 配置参数非法
    InvalidConfig = -4,
    /// 尚未调用 `unilidar_initialize`
    NotInitialized = -5,
}

impl UnilidarStatus {
    pub fn code(self) -> c_int {
        self as c_int
    }
}

impl From<&DriverError> for UnilidarStatus {
    fn from(error: &DriverError) -> Self {
        match error {
            DriverError::Serial(_) | DriverError::ReaderThread(_) => Self::TransportFailure,
            DriverError::InvalidConfig(_) => Self::InvalidConfig,
            DriverError::Protocol(_) => Self::InvalidArgument,
            DriverError::NotInitialized => Self::NotInitialized,
        }
    }
}

type BoxedTransport = Box<dyn Transport + Send>;

/// 不透明句柄
///
/// 未初始化时两个槽位都为空；初始化成功后同时填入。
pub struct UnilidarHandle {
    reader: Mutex<Option<LidarReader<BoxedTransport>>>,
    handoff: RwLock<Option<Handoff<CAllocator>>>,
}

impl UnilidarHandle {
    fn new() -> Self {
        Self {
            reader: Mutex::new(None),
            handoff: RwLock::new(None),
        }
    }

    fn install(&self, reader: LidarReader<BoxedTransport>) {
        let handoff = reader.handoff();
        // 先换掉 Reader，再换交接端，快照不会看到新旧混合
        let mut slot = self.reader.lock();
        *slot = Some(reader);
        *self.handoff.write() = Some(handoff);
    }

    /// 回到未初始化状态，关闭旧的传输
    fn uninstall(&self) {
        let mut slot = self.reader.lock();
        *slot = None;
        *self.handoff.write() = None;
    }
}

/// 存活句柄注册表（键为句柄地址）
static HANDLES: LazyLock<Mutex<HashMap<usize, Arc<UnilidarHandle>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn register(handle: UnilidarHandle) -> *mut UnilidarHandle {
    let handle = Arc::new(handle);
    let ptr = Arc::as_ptr(&handle) as *mut UnilidarHandle;
    HANDLES.lock().insert(ptr as usize, handle);
    ptr
}

/// 查找存活句柄
///
/// 返回的 `Arc` 在调用期间保持句柄存活，即使另一个线程同时销毁了它。
fn lookup(handle: *const UnilidarHandle) -> Option<Arc<UnilidarHandle>> {
    if handle.is_null() {
        return None;
    }
    let found = HANDLES.lock().get(&(handle as usize)).cloned();
    if found.is_none() {
        warn!("Rejected unknown handle {:p}", handle);
    }
    found
}

/// 在自定义传输上创建已初始化的句柄
///
/// 供 Rust 宿主把 Mock 或回放传输交给 C 代码使用。
pub fn create_handle_with_transport<T: Transport + Send + 'static>(
    transport: T,
    config: ReaderConfig,
) -> Result<*mut UnilidarHandle, DriverError> {
    let reader = LidarReader::new(Box::new(transport) as BoxedTransport, config)?;
    let handle = UnilidarHandle::new();
    handle.install(reader);
    Ok(register(handle))
}

/// 创建未初始化的句柄
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_reader_create() -> *mut UnilidarHandle {
    let ptr = register(UnilidarHandle::new());
    debug!("Created handle {:p}", ptr);
    ptr
}

/// 销毁句柄
///
/// 销毁后句柄失效，再次使用只会得到 `InvalidHandle`。
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_reader_destroy(handle: *mut UnilidarHandle) -> c_int {
    if handle.is_null() {
        return UnilidarStatus::InvalidHandle.code();
    }
    match HANDLES.lock().remove(&(handle as usize)) {
        Some(_) => {
            debug!("Destroyed handle {:p}", handle);
            UnilidarStatus::Ok.code()
        },
        None => UnilidarStatus::InvalidHandle.code(),
    }
}

/// 打开串口并初始化 Reader
///
/// 返回 0 表示成功，负数为 [`UnilidarStatus`]。任何失败都会卸下已有的 Reader，
/// 句柄回到未初始化状态，直到再次初始化成功。
///
/// # Safety
///
/// `port` 必须是以 NUL 结尾的有效 C 字符串。
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn unilidar_initialize(
    handle: *mut UnilidarHandle,
    max_points_per_revolution: u32,
    port: *const c_char,
    baud_rate: u32,
    yaw_bias: f32,
    range_scale: f32,
    range_bias: f32,
    range_max: f32,
    range_min: f32,
) -> c_int {
    let Some(handle) = lookup(handle) else {
        return UnilidarStatus::InvalidHandle.code();
    };
    if port.is_null() {
        handle.uninstall();
        return UnilidarStatus::InvalidArgument.code();
    }
    let port = match unsafe { CStr::from_ptr(port) }.to_str() {
        Ok(port) => port.to_owned(),
        Err(_) => {
            handle.uninstall();
            return UnilidarStatus::InvalidArgument.code();
        },
    };

    let config = ReaderConfig {
        max_points_per_revolution: max_points_per_revolution as usize,
        port,
        baud_rate,
        yaw_bias,
        range_scale,
        range_bias,
        range_max,
        range_min,
    };

    match open_reader(config) {
        Ok(reader) => {
            handle.install(reader);
            info!("Reader initialized");
            UnilidarStatus::Ok.code()
        },
        Err(e) => {
            handle.uninstall();
            error!("Failed to initialize reader: {}", e);
            UnilidarStatus::from(&e).code()
        },
    }
}

#[cfg(target_os = "linux")]
fn open_reader(config: ReaderConfig) -> Result<LidarReader<BoxedTransport>, DriverError> {
    config.validate()?;
    let port = unilidar_serial::TtyPort::open(config.port.clone(), config.baud_rate)?;
    LidarReader::new(Box::new(port) as BoxedTransport, config)
}

#[cfg(not(target_os = "linux"))]
fn open_reader(config: ReaderConfig) -> Result<LidarReader<BoxedTransport>, DriverError> {
    config.validate()?;
    Err(DriverError::Serial(unilidar_serial::SerialError::Device(
        "serial ports are only supported on Linux".into(),
    )))
}

/// 推进一步解析
///
/// 句柄无效或未初始化时返回 `NoMessage`。
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_parse_step(handle: *mut UnilidarHandle) -> MessageTag {
    let Some(handle) = lookup(handle) else {
        return MessageTag::NoMessage;
    };
    match handle.reader.lock().as_mut() {
        Some(reader) => reader.parse_step(),
        None => MessageTag::NoMessage,
    }
}

/// 取出最新一圈的快照
///
/// 返回 0 时 `out` 已写入；`out.ready == false` 表示还没有完整的一圈或分配失败。
/// 非空的就绪快照必须通过 `unilidar_release_snapshot_buffer` 释放。
///
/// # Safety
///
/// `out` 必须指向可写的 `BoundarySnapshot`。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unilidar_take_snapshot(
    handle: *mut UnilidarHandle,
    out: *mut BoundarySnapshot,
) -> c_int {
    if out.is_null() {
        return UnilidarStatus::InvalidArgument.code();
    }
    unsafe { out.write(BoundarySnapshot::not_ready()) };

    let Some(handle) = lookup(handle) else {
        return UnilidarStatus::InvalidHandle.code();
    };
    let guard = handle.handoff.read();
    let Some(handoff) = guard.as_ref() else {
        return UnilidarStatus::NotInitialized.code();
    };
    unsafe { out.write(handoff.take_snapshot()) };
    UnilidarStatus::Ok.code()
}

/// 释放快照缓冲区（空指针被忽略）
///
/// # Safety
///
/// `points` 必须来自 `unilidar_take_snapshot`，且只能释放一次。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unilidar_release_snapshot_buffer(points: *mut Point) {
    unsafe { release_snapshot_buffer(points) }
}

/// 复制固件版本字符串（收到版本应答之前为空串）
///
/// 返回写入的字节数（不含 NUL）。`size > 0` 时结果总以 NUL 结尾，超长截断。
///
/// # Safety
///
/// `buf` 必须指向至少 `size` 字节的可写内存。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unilidar_firmware_version(
    handle: *mut UnilidarHandle,
    buf: *mut c_char,
    size: usize,
) -> usize {
    let Some(dst) = (unsafe { output_buffer(buf, size) }) else {
        return 0;
    };
    let Some(handle) = lookup(handle) else {
        return copy_nul_terminated("", dst);
    };
    let guard = handle.reader.lock();
    let firmware = guard
        .as_ref()
        .and_then(|reader| reader.firmware_version())
        .unwrap_or("");
    copy_nul_terminated(firmware, dst)
}

/// 复制 SDK 版本字符串
///
/// # Safety
///
/// `buf` 必须指向至少 `size` 字节的可写内存。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unilidar_sdk_version(
    handle: *mut UnilidarHandle,
    buf: *mut c_char,
    size: usize,
) -> usize {
    let Some(dst) = (unsafe { output_buffer(buf, size) }) else {
        return 0;
    };
    if lookup(handle).is_none() {
        return copy_nul_terminated("", dst);
    }
    copy_nul_terminated(SDK_VERSION, dst)
}

/// # Safety
///
/// 同调用方的 `buf` / `size` 约定。
unsafe fn output_buffer<'a>(buf: *mut c_char, size: usize) -> Option<&'a mut [u8]> {
    if buf.is_null() || size == 0 {
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), size) })
}

/// 回到 Idle（已发布的最新一圈保持可读）
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_reset(handle: *mut UnilidarHandle) -> c_int {
    let Some(handle) = lookup(handle) else {
        return UnilidarStatus::InvalidHandle.code();
    };
    match handle.reader.lock().as_mut() {
        Some(reader) => {
            reader.reset();
            UnilidarStatus::Ok.code()
        },
        None => UnilidarStatus::NotInitialized.code(),
    }
}

/// 切换工作模式（1 = normal，2 = standby）
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_set_working_mode(handle: *mut UnilidarHandle, mode: u32) -> c_int {
    let Some(handle) = lookup(handle) else {
        return UnilidarStatus::InvalidHandle.code();
    };
    let Ok(mode) = WorkingMode::try_from(mode) else {
        return UnilidarStatus::InvalidArgument.code();
    };
    with_reader(&handle, |reader| reader.set_working_mode(mode))
}

/// 请求设备上报版本（应答由后续的 `unilidar_parse_step` 处理）
#[unsafe(no_mangle)]
pub extern "C" fn unilidar_request_version(handle: *mut UnilidarHandle) -> c_int {
    let Some(handle) = lookup(handle) else {
        return UnilidarStatus::InvalidHandle.code();
    };
    with_reader(&handle, |reader| reader.request_version())
}

fn with_reader(
    handle: &UnilidarHandle,
    f: impl FnOnce(&mut LidarReader<BoxedTransport>) -> Result<(), DriverError>,
) -> c_int {
    let mut guard = handle.reader.lock();
    let Some(reader) = guard.as_mut() else {
        return UnilidarStatus::NotInitialized.code();
    };
    match f(reader) {
        Ok(()) => UnilidarStatus::Ok.code(),
        Err(e) => {
            warn!("Command failed: {}", e);
            UnilidarStatus::from(&e).code()
        },
    }
}
