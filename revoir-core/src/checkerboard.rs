use glam::{uvec2, IVec2, UVec2};

/// Half-rate rendering mode: with checkerboarding enabled, reservoirs exist
/// for only one pixel parity per frame and the storage width is halved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckerboardMode {
    #[default]
    Off,
    Black,
    White,
}

impl CheckerboardMode {
    /// Field active during the given frame: 0 when checkerboarding is off,
    /// otherwise 1 or 2, alternating every frame.
    pub fn active_field(self, frame_index: u32) -> u32 {
        match self {
            Self::Off => 0,
            Self::Black => {
                if frame_index & 1 != 0 {
                    1
                } else {
                    2
                }
            }
            Self::White => {
                if frame_index & 1 != 0 {
                    2
                } else {
                    1
                }
            }
        }
    }
}

pub fn pixel_to_reservoir_pos(pixel: UVec2, field: u32) -> UVec2 {
    if field == 0 {
        pixel
    } else {
        uvec2(pixel.x >> 1, pixel.y)
    }
}

pub fn reservoir_pos_to_pixel(pos: UVec2, field: u32) -> UVec2 {
    if field == 0 {
        pos
    } else {
        uvec2((pos.x << 1) + ((pos.y + field) & 1), pos.y)
    }
}

pub fn is_active_checkerboard_pixel(
    pixel: IVec2,
    previous_frame: bool,
    field: u32,
) -> bool {
    if field == 0 {
        return true;
    }

    ((pixel.x + pixel.y + previous_frame as i32) & 1) as u32 == (field & 1)
}

/// Snaps a pixel onto the active field; inactive pixels move to a horizontal
/// neighbor, active ones stay put.
pub fn activate_checkerboard_pixel(
    pixel: IVec2,
    previous_frame: bool,
    field: u32,
) -> IVec2 {
    if is_active_checkerboard_pixel(pixel, previous_frame, field) {
        return pixel;
    }

    let mut pixel = pixel;

    if previous_frame {
        pixel.x += field as i32 * 2 - 3;
    } else {
        pixel.x += if pixel.y & 1 != 0 { 1 } else { -1 };
    }

    pixel
}

#[cfg(test)]
mod tests {
    use glam::ivec2;

    use super::*;

    #[test]
    fn field_alternates() {
        for frame in 0..8 {
            assert_eq!(CheckerboardMode::Off.active_field(frame), 0);

            let black = CheckerboardMode::Black.active_field(frame);
            let white = CheckerboardMode::White.active_field(frame);

            assert!(black == 1 || black == 2);
            assert_eq!(black + white, 3);
            assert_ne!(black, CheckerboardMode::Black.active_field(frame + 1));
        }
    }

    #[test]
    fn mapping_is_identity_when_off() {
        for x in 0..8 {
            for y in 0..8 {
                let pixel = uvec2(x, y);

                assert_eq!(pixel_to_reservoir_pos(pixel, 0), pixel);
                assert_eq!(reservoir_pos_to_pixel(pixel, 0), pixel);
            }
        }
    }

    #[test]
    fn mapping_roundtrips_on_active_pixels() {
        for field in [1, 2] {
            for x in 0..16i32 {
                for y in 0..16i32 {
                    let pixel = ivec2(x, y);

                    if !is_active_checkerboard_pixel(pixel, false, field) {
                        continue;
                    }

                    let pixel = pixel.as_uvec2();
                    let pos = pixel_to_reservoir_pos(pixel, field);

                    assert_eq!(reservoir_pos_to_pixel(pos, field), pixel);
                }
            }
        }
    }

    #[test]
    fn activation_lands_on_the_active_field() {
        for field in [1, 2] {
            for previous_frame in [false, true] {
                for x in 0..8 {
                    for y in 0..8 {
                        let pixel = ivec2(x, y);

                        let active = activate_checkerboard_pixel(
                            pixel,
                            previous_frame,
                            field,
                        );

                        assert!(is_active_checkerboard_pixel(
                            active,
                            previous_frame,
                            field,
                        ));

                        assert!((active - pixel).abs().max_element() <= 2);
                    }
                }
            }
        }
    }
}
