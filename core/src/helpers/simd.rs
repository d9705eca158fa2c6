use simdeez::prelude::*;

/// Sum the values of `source` to the values of `target`, writing to `target`.
///
/// Uses runtime selected SIMD operations. Only the first `source.len()`
/// values of `target` are touched.
pub fn sum_simd(source: &[f32], target: &mut [f32]) {
    simd_runtime_generate!(
        fn sum(source: &[f32], target: &mut [f32]) {
            let mut source = source;
            let mut target = &mut target[..source.len()];

            while source.len() >= S::VF32_WIDTH {
                let mixed = S::loadu_ps(&source[0]) + S::loadu_ps(&target[0]);
                S::storeu_ps(&mut target[0], mixed);

                source = &source[S::VF32_WIDTH..];
                target = &mut std::mem::take(&mut target)[S::VF32_WIDTH..];
            }

            for (t, s) in target.iter_mut().zip(source.iter()) {
                *t += *s;
            }
        }
    );

    sum(source, target);
}
