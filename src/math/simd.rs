//! Batch vector kernels (`addSlice`/`addMulSlice`) with CPU-feature dispatch.
//!
//! [`VecKernel`] is a trait object chosen once, at first use, based on
//! runtime CPU feature detection, rather than picked at compile time. A
//! [`ScalarKernel`] is always available and is guaranteed to agree with
//! the SIMD path to within 1 ULP; it is also what every
//! non-x86_64/non-aarch64 target falls back to.

use std::sync::OnceLock;

use super::vec2::V2;
use super::vec3::V3;
use super::vec4::V4;

/// A batch kernel capable of the pairwise `addSlice` and fused
/// `addMulSlice` (`a + b*c`, componentwise) operations over equal-length
/// slices of `V2`/`V3`/`V4`.
///
/// Every method panics (via `assert_eq!` on the lengths) if `lhs`, `rhs` (and
/// `out`, where present) don't all have the same length. This is a
/// precondition violation, not a recoverable error.
pub trait VecKernel: Send + Sync {
    /// `out[i] = lhs[i] + rhs[i]` for `V2`.
    fn add_slice_v2(&self, lhs: &[V2], rhs: &[V2], out: &mut [V2]);
    /// `out[i] = a[i] + b[i] * c[i]` for `V2`.
    fn add_mul_slice_v2(&self, a: &[V2], b: &[V2], c: &[V2], out: &mut [V2]);
    /// `out[i] = lhs[i] + rhs[i]` for `V3`.
    fn add_slice_v3(&self, lhs: &[V3], rhs: &[V3], out: &mut [V3]);
    /// `out[i] = a[i] + b[i] * c[i]` for `V3`.
    fn add_mul_slice_v3(&self, a: &[V3], b: &[V3], c: &[V3], out: &mut [V3]);
    /// `out[i] = lhs[i] + rhs[i]` for `V4`.
    fn add_slice_v4(&self, lhs: &[V4], rhs: &[V4], out: &mut [V4]);
    /// `out[i] = a[i] + b[i] * c[i]` for `V4`.
    fn add_mul_slice_v4(&self, a: &[V4], b: &[V4], c: &[V4], out: &mut [V4]);

    /// Name of the dispatched backend, for diagnostics/logging only.
    fn name(&self) -> &'static str;
}

/// Portable scalar fallback. Correct by construction; the baseline every
/// SIMD kernel is tested against.
pub struct ScalarKernel;

impl VecKernel for ScalarKernel {
    fn add_slice_v2(&self, lhs: &[V2], rhs: &[V2], out: &mut [V2]) {
        assert_eq!(lhs.len(), rhs.len());
        assert_eq!(lhs.len(), out.len());
        for i in 0..lhs.len() {
            out[i] = lhs[i] + rhs[i];
        }
    }
    fn add_mul_slice_v2(&self, a: &[V2], b: &[V2], c: &[V2], out: &mut [V2]) {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), c.len());
        assert_eq!(a.len(), out.len());
        for i in 0..a.len() {
            out[i] = a[i] + b[i] * c[i];
        }
    }
    fn add_slice_v3(&self, lhs: &[V3], rhs: &[V3], out: &mut [V3]) {
        assert_eq!(lhs.len(), rhs.len());
        assert_eq!(lhs.len(), out.len());
        for i in 0..lhs.len() {
            out[i] = lhs[i] + rhs[i];
        }
    }
    fn add_mul_slice_v3(&self, a: &[V3], b: &[V3], c: &[V3], out: &mut [V3]) {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), c.len());
        assert_eq!(a.len(), out.len());
        for i in 0..a.len() {
            out[i] = V3::new(
                a[i].x + b[i].x * c[i].x,
                a[i].y + b[i].y * c[i].y,
                a[i].z + b[i].z * c[i].z,
            );
        }
    }
    fn add_slice_v4(&self, lhs: &[V4], rhs: &[V4], out: &mut [V4]) {
        assert_eq!(lhs.len(), rhs.len());
        assert_eq!(lhs.len(), out.len());
        for i in 0..lhs.len() {
            out[i] = lhs[i] + rhs[i];
        }
    }
    fn add_mul_slice_v4(&self, a: &[V4], b: &[V4], c: &[V4], out: &mut [V4]) {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), c.len());
        assert_eq!(a.len(), out.len());
        for i in 0..a.len() {
            out[i] = V4::new(
                a[i].x + b[i].x * c[i].x,
                a[i].y + b[i].y * c[i].y,
                a[i].z + b[i].z * c[i].z,
                a[i].w + b[i].w * c[i].w,
            );
        }
    }
    fn name(&self) -> &'static str {
        "scalar"
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::*;
    use std::arch::x86_64::*;

    /// AVX2+FMA kernel. `V3`/`V4` are both 16 bytes wide (4 `f32` lanes,
    /// `V3`'s 4th lane being the always-zero padding lane), so two of either
    /// fit in one 256-bit register; the tail (odd count) falls back to
    /// scalar math.
    pub struct Avx2FmaKernel;

    #[target_feature(enable = "avx2,fma")]
    unsafe fn add_pairs(lhs: *const f32, rhs: *const f32, out: *mut f32, pairs: usize) {
        for i in 0..pairs {
            let a = _mm256_loadu_ps(lhs.add(i * 8));
            let b = _mm256_loadu_ps(rhs.add(i * 8));
            let r = _mm256_add_ps(a, b);
            _mm256_storeu_ps(out.add(i * 8), r);
        }
    }

    #[target_feature(enable = "avx2,fma")]
    unsafe fn add_mul_pairs(a: *const f32, b: *const f32, c: *const f32, out: *mut f32, pairs: usize) {
        for i in 0..pairs {
            let va = _mm256_loadu_ps(a.add(i * 8));
            let vb = _mm256_loadu_ps(b.add(i * 8));
            let vc = _mm256_loadu_ps(c.add(i * 8));
            let r = _mm256_fmadd_ps(vb, vc, va);
            _mm256_storeu_ps(out.add(i * 8), r);
        }
    }

    impl VecKernel for Avx2FmaKernel {
        fn add_slice_v2(&self, lhs: &[V2], rhs: &[V2], out: &mut [V2]) {
            // V2 is 8 bytes wide: 4 of them make one 256-bit register.
            assert_eq!(lhs.len(), rhs.len());
            assert_eq!(lhs.len(), out.len());
            let groups = lhs.len() / 4;
            unsafe {
                add_pairs(
                    lhs.as_ptr() as *const f32,
                    rhs.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    groups,
                );
            }
            for i in groups * 4..lhs.len() {
                out[i] = lhs[i] + rhs[i];
            }
        }
        fn add_mul_slice_v2(&self, a: &[V2], b: &[V2], c: &[V2], out: &mut [V2]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), c.len());
            assert_eq!(a.len(), out.len());
            let groups = a.len() / 4;
            unsafe {
                add_mul_pairs(
                    a.as_ptr() as *const f32,
                    b.as_ptr() as *const f32,
                    c.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    groups,
                );
            }
            for i in groups * 4..a.len() {
                out[i] = a[i] + b[i] * c[i];
            }
        }
        fn add_slice_v3(&self, lhs: &[V3], rhs: &[V3], out: &mut [V3]) {
            assert_eq!(lhs.len(), rhs.len());
            assert_eq!(lhs.len(), out.len());
            let pairs = lhs.len() / 2;
            unsafe {
                add_pairs(
                    lhs.as_ptr() as *const f32,
                    rhs.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    pairs,
                );
            }
            for i in pairs * 2..lhs.len() {
                out[i] = lhs[i] + rhs[i];
            }
        }
        fn add_mul_slice_v3(&self, a: &[V3], b: &[V3], c: &[V3], out: &mut [V3]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), c.len());
            assert_eq!(a.len(), out.len());
            let pairs = a.len() / 2;
            unsafe {
                add_mul_pairs(
                    a.as_ptr() as *const f32,
                    b.as_ptr() as *const f32,
                    c.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    pairs,
                );
            }
            for i in pairs * 2..a.len() {
                out[i] = V3::new(
                    a[i].x + b[i].x * c[i].x,
                    a[i].y + b[i].y * c[i].y,
                    a[i].z + b[i].z * c[i].z,
                );
            }
        }
        fn add_slice_v4(&self, lhs: &[V4], rhs: &[V4], out: &mut [V4]) {
            assert_eq!(lhs.len(), rhs.len());
            assert_eq!(lhs.len(), out.len());
            let pairs = lhs.len() / 2;
            unsafe {
                add_pairs(
                    lhs.as_ptr() as *const f32,
                    rhs.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    pairs,
                );
            }
            for i in pairs * 2..lhs.len() {
                out[i] = lhs[i] + rhs[i];
            }
        }
        fn add_mul_slice_v4(&self, a: &[V4], b: &[V4], c: &[V4], out: &mut [V4]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), c.len());
            assert_eq!(a.len(), out.len());
            let pairs = a.len() / 2;
            unsafe {
                add_mul_pairs(
                    a.as_ptr() as *const f32,
                    b.as_ptr() as *const f32,
                    c.as_ptr() as *const f32,
                    out.as_mut_ptr() as *mut f32,
                    pairs,
                );
            }
            for i in pairs * 2..a.len() {
                out[i] = V4::new(
                    a[i].x + b[i].x * c[i].x,
                    a[i].y + b[i].y * c[i].y,
                    a[i].z + b[i].z * c[i].z,
                    a[i].w + b[i].w * c[i].w,
                );
            }
        }
        fn name(&self) -> &'static str {
            "avx2+fma"
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod arm {
    use super::*;
    use std::arch::aarch64::*;

    /// NEON kernel. NEON is baseline on aarch64, so no runtime detection is
    /// required the way it is on x86_64.
    pub struct NeonKernel;

    #[inline(always)]
    unsafe fn add_one(lhs: *const f32, rhs: *const f32, out: *mut f32) {
        let a = vld1q_f32(lhs);
        let b = vld1q_f32(rhs);
        vst1q_f32(out, vaddq_f32(a, b));
    }

    #[inline(always)]
    unsafe fn add_mul_one(a: *const f32, b: *const f32, c: *const f32, out: *mut f32) {
        let va = vld1q_f32(a);
        let vb = vld1q_f32(b);
        let vc = vld1q_f32(c);
        vst1q_f32(out, vfmaq_f32(va, vb, vc));
    }

    impl VecKernel for NeonKernel {
        fn add_slice_v2(&self, lhs: &[V2], rhs: &[V2], out: &mut [V2]) {
            ScalarKernel.add_slice_v2(lhs, rhs, out);
        }
        fn add_mul_slice_v2(&self, a: &[V2], b: &[V2], c: &[V2], out: &mut [V2]) {
            ScalarKernel.add_mul_slice_v2(a, b, c, out);
        }
        fn add_slice_v3(&self, lhs: &[V3], rhs: &[V3], out: &mut [V3]) {
            assert_eq!(lhs.len(), rhs.len());
            assert_eq!(lhs.len(), out.len());
            for i in 0..lhs.len() {
                unsafe {
                    add_one(
                        lhs[i].as_array4().as_ptr(),
                        rhs[i].as_array4().as_ptr(),
                        out.as_mut_ptr().add(i) as *mut f32,
                    );
                }
            }
        }
        fn add_mul_slice_v3(&self, a: &[V3], b: &[V3], c: &[V3], out: &mut [V3]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), c.len());
            assert_eq!(a.len(), out.len());
            for i in 0..a.len() {
                unsafe {
                    add_mul_one(
                        a[i].as_array4().as_ptr(),
                        b[i].as_array4().as_ptr(),
                        c[i].as_array4().as_ptr(),
                        out.as_mut_ptr().add(i) as *mut f32,
                    );
                }
            }
        }
        fn add_slice_v4(&self, lhs: &[V4], rhs: &[V4], out: &mut [V4]) {
            assert_eq!(lhs.len(), rhs.len());
            assert_eq!(lhs.len(), out.len());
            for i in 0..lhs.len() {
                unsafe {
                    add_one(
                        &lhs[i] as *const V4 as *const f32,
                        &rhs[i] as *const V4 as *const f32,
                        &mut out[i] as *mut V4 as *mut f32,
                    );
                }
            }
        }
        fn add_mul_slice_v4(&self, a: &[V4], b: &[V4], c: &[V4], out: &mut [V4]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), c.len());
            assert_eq!(a.len(), out.len());
            for i in 0..a.len() {
                unsafe {
                    add_mul_one(
                        &a[i] as *const V4 as *const f32,
                        &b[i] as *const V4 as *const f32,
                        &c[i] as *const V4 as *const f32,
                        &mut out[i] as *mut V4 as *mut f32,
                    );
                }
            }
        }
        fn name(&self) -> &'static str {
            "neon"
        }
    }
}

static KERNEL: OnceLock<Box<dyn VecKernel>> = OnceLock::new();

/// Returns the process-wide batch kernel, detecting CPU features and
/// picking the fastest available implementation on first call. The choice
/// is cached for the lifetime of the process.
pub fn active_kernel() -> &'static dyn VecKernel {
    KERNEL
        .get_or_init(|| -> Box<dyn VecKernel> {
            #[cfg(target_arch = "x86_64")]
            {
                if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                    return Box::new(x86::Avx2FmaKernel);
                }
            }
            #[cfg(target_arch = "aarch64")]
            {
                return Box::new(arm::NeonKernel);
            }
            #[allow(unreachable_code)]
            Box::new(ScalarKernel)
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_add_slice_v3() {
        let lhs = vec![V3::new(1.0, 2.0, 3.0); 5];
        let rhs = vec![V3::new(1.0, 1.0, 1.0); 5];
        let mut out = vec![V3::ZERO; 5];
        ScalarKernel.add_slice_v3(&lhs, &rhs, &mut out);
        assert!(out.iter().all(|v| *v == V3::new(2.0, 3.0, 4.0)));
    }

    #[test]
    #[should_panic]
    fn mismatched_lengths_panic() {
        let lhs = vec![V3::ZERO; 3];
        let rhs = vec![V3::ZERO; 2];
        let mut out = vec![V3::ZERO; 3];
        ScalarKernel.add_slice_v3(&lhs, &rhs, &mut out);
    }

    #[test]
    fn active_kernel_agrees_with_scalar_within_ulp() {
        let lhs: Vec<V3> = (0..37).map(|i| V3::new(i as f32, -(i as f32), i as f32 * 0.5)).collect();
        let rhs: Vec<V3> = (0..37).map(|i| V3::new(1.0, 2.0, 3.0 + i as f32)).collect();
        let mut scalar_out = vec![V3::ZERO; lhs.len()];
        let mut kernel_out = vec![V3::ZERO; lhs.len()];
        ScalarKernel.add_slice_v3(&lhs, &rhs, &mut scalar_out);
        active_kernel().add_slice_v3(&lhs, &rhs, &mut kernel_out);
        for (a, b) in scalar_out.iter().zip(kernel_out.iter()) {
            assert!((a.x - b.x).abs() <= f32::EPSILON);
            assert!((a.y - b.y).abs() <= f32::EPSILON);
            assert!((a.z - b.z).abs() <= f32::EPSILON);
        }
    }

    #[test]
    fn add_mul_slice_v4_is_fma_contract() {
        let a = vec![V4::new(1.0, 1.0, 1.0, 1.0); 9];
        let b = vec![V4::new(2.0, 2.0, 2.0, 2.0); 9];
        let c = vec![V4::new(3.0, 3.0, 3.0, 3.0); 9];
        let mut out = vec![V4::ZERO; 9];
        active_kernel().add_mul_slice_v4(&a, &b, &c, &mut out);
        assert!(out.iter().all(|v| *v == V4::new(7.0, 7.0, 7.0, 7.0)));
    }
}
