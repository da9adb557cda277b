use pck_registration::registration::{PlatformError, PlatformIdentity};
use std::mem::MaybeUninit;

const MAX_ENCRYPTED_PPID_SIZE: usize = 384;
const QE_ID_SIZE: usize = 16;
const CPU_SVN_SIZE: usize = 16;

const PLATFORM_INFO_SUCCESS: u32 = 0xF000;

#[repr(C)]
struct PceInfo {
    pce_isv_svn: u16,
    pce_id: u16,
}

#[repr(C)]
struct RawPlatformInfo {
    pce_info: PceInfo,
    encrypted_ppid_out_size: u32,
    encrypted_ppid: [u8; MAX_ENCRYPTED_PPID_SIZE],
    qe_id: [u8; QE_ID_SIZE],
    cpu_svn: [u8; CPU_SVN_SIZE],
}

#[link(name = "sgx_platform_info")]
#[link(name = "sgx_urts")]
#[link(name = "sgx_dcap_ql")]
#[link(name = "sgx_pce_logic")]
extern "C" {
    fn get_platform_info(platform_info: *mut RawPlatformInfo) -> u32;
}

/// Vendor description of a `get_platform_info` result code.
fn describe(code: u32) -> &'static str {
    match code {
        0xF001 => "Unexpected error",
        0xF002 => "The parameter is incorrect",
        0xF003 => "Not enough memory is available to complete this operation",
        0xF004 => "SGX API is unavailable",
        0xF005 => "SGX report cannot be verified",
        0xF006 => "Cannot decrypt or verify ciphertext",
        0xF007 => "Not enough privilege to perform the operation",
        0xF008 => "PCE could not sign at the requested TCB",
        0xF009 => "The Enclave could not be created",
        _ => "Unknown Error",
    }
}

/// Runs the platform-info enclave and hex-encodes its output.
pub fn read_platform_identity() -> Result<PlatformIdentity, PlatformError> {
    let mut raw = MaybeUninit::<RawPlatformInfo>::zeroed();
    // SAFETY: `raw` is a zeroed, correctly laid out `platform_info_t` that the
    // library fills in; it is only read after a success return.
    let result = unsafe { get_platform_info(raw.as_mut_ptr()) };
    if result != PLATFORM_INFO_SUCCESS {
        return Err(PlatformError(format!(
            "failed to get platform info: {} (0x{result:04x})",
            describe(result)
        )));
    }
    // SAFETY: every field is plain data and the call succeeded.
    let info = unsafe { raw.assume_init() };

    let ppid_len = (info.encrypted_ppid_out_size as usize).min(MAX_ENCRYPTED_PPID_SIZE);
    Ok(PlatformIdentity {
        encrypted_ppid: hex::encode(&info.encrypted_ppid[..ppid_len]),
        pce_id: format!("{:04x}", info.pce_info.pce_id),
        pce_isv_svn: format!("{:04x}", info.pce_info.pce_isv_svn),
        qe_id: hex::encode(info.qe_id),
        cpu_svn: hex::encode(info.cpu_svn),
    })
}
