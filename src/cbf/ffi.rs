//! CBFlib binding.
//!
//! `libcbf` is opened at runtime with libloading so the crate builds and
//! tests without CBFlib installed. Only the handful of calls needed to pull
//! one integer array out of a file are bound.

// FFI into CBFlib and libc
#![allow(unsafe_code)]

use crate::cbf::decoder::{ArrayParameters, DataLocation, DecodedFrame, FrameDecoder};
use crate::error::{CbfError, Error, Result};
use libloading::Library;
use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Library names tried when no explicit path is given.
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libcbf.so",
    "libcbf.so.0",
    "libcbf.dylib",
    "cbf.dll",
];

/// `MSG_NODIGEST` from `cbf.h`: don't verify MD5 digests while reading.
const MSG_NODIGEST: c_int = 0x0004;

type CbfHandle = *mut c_void;

type MakeHandleFn = unsafe extern "C" fn(*mut CbfHandle) -> c_int;
type FreeHandleFn = unsafe extern "C" fn(CbfHandle) -> c_int;
type ReadWideFileFn = unsafe extern "C" fn(CbfHandle, *mut libc::FILE, c_int) -> c_int;
type FindFn = unsafe extern "C" fn(CbfHandle, *const c_char) -> c_int;
type SelectRowFn = unsafe extern "C" fn(CbfHandle, c_uint) -> c_int;
type TypeOfValueFn = unsafe extern "C" fn(CbfHandle, *mut *const c_char) -> c_int;
type ArrayParametersFn = unsafe extern "C" fn(
    CbfHandle,
    *mut c_uint,
    *mut c_int,
    *mut usize,
    *mut c_int,
    *mut c_int,
    *mut usize,
    *mut c_int,
    *mut c_int,
    *mut *const c_char,
    *mut usize,
    *mut usize,
    *mut usize,
    *mut usize,
) -> c_int;
type IntegerArrayFn =
    unsafe extern "C" fn(CbfHandle, *mut c_int, *mut c_void, usize, c_int, usize, *mut usize) -> c_int;

/// An opened `libcbf` with its resolved entry points.
pub struct CbfLibrary {
    path: String,
    make_handle: MakeHandleFn,
    free_handle: FreeHandleFn,
    read_widefile: ReadWideFileFn,
    find_category: FindFn,
    find_column: FindFn,
    select_row: SelectRowFn,
    get_typeofvalue: TypeOfValueFn,
    get_integerarrayparameters_wdims: ArrayParametersFn,
    get_integerarray: IntegerArrayFn,
    // Keeps the function pointers above valid
    _library: Library,
}

impl std::fmt::Debug for CbfLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbfLibrary").field("path", &self.path).finish()
    }
}

impl CbfLibrary {
    /// Opens `libcbf`.
    ///
    /// With `explicit` set only that path is tried, otherwise each of
    /// [`DEFAULT_LIBRARY_NAMES`] in turn.
    ///
    /// # Errors
    ///
    /// Returns [`CbfError::LibraryUnavailable`] if no candidate opens and
    /// [`CbfError::MissingSymbol`] if a required function is absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidates: Vec<PathBuf> = explicit.map_or_else(
            || DEFAULT_LIBRARY_NAMES.iter().map(PathBuf::from).collect(),
            |p| vec![p.to_path_buf()],
        );

        let mut last_error = String::from("no candidates");
        for candidate in &candidates {
            // Safety: CBFlib has no load-time initialisers with preconditions
            match unsafe { Library::new(candidate) } {
                Ok(library) => {
                    let path = candidate.to_string_lossy().to_string();
                    info!(library = %path, "loaded CBFlib");
                    return Self::bind(library, path);
                }
                Err(err) => {
                    debug!(library = %candidate.display(), error = %err, "CBFlib candidate failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(CbfError::LibraryUnavailable {
            tried: candidates
                .iter()
                .map(|c| c.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", "),
            reason: last_error,
        }
        .into())
    }

    fn bind(library: Library, path: String) -> Result<Self> {
        fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
            let mut bytes = name.as_bytes().to_vec();
            bytes.push(0);
            // Safety: each requested type matches the prototype in cbf.h
            unsafe {
                library
                    .get::<T>(&bytes)
                    .map(|s| *s)
                    .map_err(|e| {
                        CbfError::MissingSymbol {
                            symbol: name,
                            reason: e.to_string(),
                        }
                        .into()
                    })
            }
        }

        Ok(Self {
            make_handle: symbol(&library, "cbf_make_handle")?,
            free_handle: symbol(&library, "cbf_free_handle")?,
            read_widefile: symbol(&library, "cbf_read_widefile")?,
            find_category: symbol(&library, "cbf_find_category")?,
            find_column: symbol(&library, "cbf_find_column")?,
            select_row: symbol(&library, "cbf_select_row")?,
            get_typeofvalue: symbol(&library, "cbf_get_typeofvalue")?,
            get_integerarrayparameters_wdims: symbol(
                &library,
                "cbf_get_integerarrayparameters_wdims",
            )?,
            get_integerarray: symbol(&library, "cbf_get_integerarray")?,
            path,
            _library: library,
        })
    }

    /// Path or name the library was opened from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A CBFlib handle, freed on drop.
struct Handle<'a> {
    library: &'a CbfLibrary,
    raw: CbfHandle,
    path: &'a str,
}

impl<'a> Handle<'a> {
    fn new(library: &'a CbfLibrary, path: &'a str) -> Result<Self> {
        let mut raw: CbfHandle = std::ptr::null_mut();
        // Safety: `raw` is a valid out-pointer
        let code = unsafe { (library.make_handle)(&raw mut raw) };
        let handle = Self { library, raw, path };
        handle.check("cbf_make_handle", code)?;
        Ok(handle)
    }

    fn check(&self, function: &'static str, code: c_int) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(CbfError::Call {
                function,
                path: self.path.to_string(),
                code,
            }
            .into())
        }
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            // Safety: `raw` came from cbf_make_handle and is freed once.
            // This also closes the stream handed to cbf_read_widefile.
            unsafe {
                (self.library.free_handle)(self.raw);
            }
        }
    }
}

/// [`FrameDecoder`] backed by CBFlib.
#[derive(Debug, Clone)]
pub struct CbfLibDecoder {
    library: Arc<CbfLibrary>,
    category: CString,
    column: CString,
    row: c_uint,
}

impl CbfLibDecoder {
    /// Creates a decoder reading `location` from each file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the category or column name holds
    /// a NUL byte.
    pub fn new(library: Arc<CbfLibrary>, location: &DataLocation) -> Result<Self> {
        let c_string = |s: &str| {
            CString::new(s).map_err(|_| Error::Config {
                message: format!("CBF name contains NUL byte: {s:?}"),
            })
        };
        Ok(Self {
            library,
            category: c_string(&location.category)?,
            column: c_string(&location.column)?,
            row: location.row,
        })
    }

    /// Loads CBFlib and creates a decoder for the default data location.
    ///
    /// # Errors
    ///
    /// Returns an error if the library can't be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::new(Arc::new(CbfLibrary::load(explicit)?), &DataLocation::default())
    }

    /// The underlying library.
    #[must_use]
    pub fn library(&self) -> &CbfLibrary {
        &self.library
    }
}

impl FrameDecoder for CbfLibDecoder {
    #[allow(clippy::similar_names)]
    fn decode(&self, path: &Path) -> Result<DecodedFrame> {
        let lib = &*self.library;
        let path_str = path.to_string_lossy().to_string();
        let c_path = CString::new(path_str.as_bytes()).map_err(|_| CbfError::InvalidPath {
            path: path_str.clone(),
        })?;

        let handle = Handle::new(lib, &path_str)?;

        // Safety: both arguments are NUL-terminated strings
        let stream = unsafe { libc::fopen(c_path.as_ptr(), c"rb".as_ptr()) };
        if stream.is_null() {
            return Err(CbfError::Open {
                path: path_str.clone(),
                reason: std::io::Error::last_os_error().to_string(),
            }
            .into());
        }

        // Safety: from here on CBFlib owns `stream` and closes it with the handle
        unsafe {
            handle.check(
                "cbf_read_widefile",
                (lib.read_widefile)(handle.raw, stream, MSG_NODIGEST),
            )?;
            handle.check(
                "cbf_find_category",
                (lib.find_category)(handle.raw, self.category.as_ptr()),
            )?;
            handle.check(
                "cbf_find_column",
                (lib.find_column)(handle.raw, self.column.as_ptr()),
            )?;
            handle.check("cbf_select_row", (lib.select_row)(handle.raw, self.row))?;
        }

        let mut kind: *const c_char = std::ptr::null();
        // Safety: `kind` is a valid out-pointer; CBFlib returns a static string
        let kind = unsafe {
            handle.check(
                "cbf_get_typeofvalue",
                (lib.get_typeofvalue)(handle.raw, &raw mut kind),
            )?;
            if kind.is_null() {
                String::new()
            } else {
                CStr::from_ptr(kind).to_string_lossy().into_owned()
            }
        };
        if !kind.contains("bnry") {
            return Err(CbfError::NotBinary {
                path: path_str.clone(),
                found: kind,
            }
            .into());
        }

        let mut compression: c_uint = 0;
        let mut binary_id: c_int = 0;
        let mut element_size: usize = 0;
        let mut el_signed: c_int = 0;
        let mut el_unsigned: c_int = 0;
        let mut elements: usize = 0;
        let mut min_element: c_int = 0;
        let mut max_element: c_int = 0;
        let mut byte_order: *const c_char = std::ptr::null();
        let mut dim_fast: usize = 0;
        let mut dim_mid: usize = 0;
        let mut dim_slow: usize = 0;
        let mut padding: usize = 0;

        // Safety: every argument is a valid out-pointer
        let byte_order = unsafe {
            handle.check(
                "cbf_get_integerarrayparameters_wdims",
                (lib.get_integerarrayparameters_wdims)(
                    handle.raw,
                    &raw mut compression,
                    &raw mut binary_id,
                    &raw mut element_size,
                    &raw mut el_signed,
                    &raw mut el_unsigned,
                    &raw mut elements,
                    &raw mut min_element,
                    &raw mut max_element,
                    &raw mut byte_order,
                    &raw mut dim_fast,
                    &raw mut dim_mid,
                    &raw mut dim_slow,
                    &raw mut padding,
                ),
            )?;
            if byte_order.is_null() {
                String::new()
            } else {
                CStr::from_ptr(byte_order).to_string_lossy().into_owned()
            }
        };

        let params = ArrayParameters {
            compression,
            binary_id,
            element_size,
            signed: el_signed != 0,
            unsigned: el_unsigned != 0,
            elements,
            min_element,
            max_element,
            byte_order,
            dim_fast,
            dim_mid,
            dim_slow,
            padding,
        };

        let mut pixels = vec![0_i32; elements];
        let mut elements_read: usize = 0;
        // Safety: `pixels` holds `elements` i32 slots
        unsafe {
            handle.check(
                "cbf_get_integerarray",
                (lib.get_integerarray)(
                    handle.raw,
                    &raw mut binary_id,
                    pixels.as_mut_ptr().cast::<c_void>(),
                    std::mem::size_of::<i32>(),
                    1,
                    elements,
                    &raw mut elements_read,
                ),
            )?;
        }

        if elements_read < elements {
            return Err(CbfError::ShortRead {
                path: path_str.clone(),
                read: elements_read,
                expected: elements,
            }
            .into());
        }

        debug!(
            path = %path_str,
            elements,
            compression = params.compression_name(),
            "decoded frame"
        );
        Ok(DecodedFrame { pixels, params })
    }

    fn name(&self) -> &'static str {
        "cbflib"
    }
}
