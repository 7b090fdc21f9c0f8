use crate::{body::Body, universe::Universe};
use tracing::{error, warn};
use ultraviolet::Vec2;

/// Returns null if `computations_per_second` is not a positive finite rate.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_Create(computations_per_second: f32) -> *mut Universe {
    match Universe::new(computations_per_second, Vec::new()) {
        Ok(universe) => Box::into_raw(Box::new(universe)),
        Err(err) => {
            error!("unable to create universe: {:#}", err);
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_Destroy(handle: *mut Universe) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

/// Returns false if the tick failed; the universe must not be ticked again.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_Tick(handle: *mut Universe) -> bool {
    let Some(universe) = (unsafe { handle.as_mut() }) else {
        return false;
    };
    match universe.tick() {
        Ok(()) => true,
        Err(err) => {
            error!("tick failed: {:#}", err);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_GetBodyCount(handle: *const Universe) -> usize {
    unsafe { handle.as_ref() }.map_or(0, Universe::body_count)
}

/// Pointer to `Universe_GetBodyCount` bodies, valid until the next tick or insertion.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_GetBodies(handle: *const Universe) -> *const Body {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |universe| universe.bodies().as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_GetDuration(handle: *const Universe) -> f32 {
    unsafe { handle.as_ref() }.map_or(0.0, Universe::duration)
}

/// Returns false if the handle is null or the body is rejected.
/// Mass must be positive and every component finite.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Universe_AddBody(
    handle: *mut Universe,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    mass: f32,
) -> bool {
    let Some(universe) = (unsafe { handle.as_mut() }) else {
        return false;
    };

    let body = Body::new(Vec2::new(x, y), Vec2::new(vx, vy), mass);
    if !(body.is_finite() && mass.is_finite() && mass > 0.0) {
        warn!(x, y, vx, vy, mass, "rejected body");
        return false;
    }

    universe.add_body(body);
    true
}
