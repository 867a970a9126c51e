use glam::{vec3, Vec3};

pub trait F32Ext
where
    Self: Sized,
{
    fn saturate(self) -> Self;
}

impl F32Ext for f32 {
    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }
}

pub trait Vec3Ext
where
    Self: Sized,
{
    fn luminance(self) -> f32;
}

impl Vec3Ext for Vec3 {
    fn luminance(self) -> f32 {
        self.dot(vec3(0.2126, 0.7152, 0.0722))
    }
}
