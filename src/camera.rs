//! Camera state, its GPU uniform, and orbit controls.

use std::f32::consts::PI;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3, Zero};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::config::OrbitSettings;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Size of the render target in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `None` while either side is zero (minimized windows).
    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

/// Perspective camera pose and projection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov_y: Deg<f32>,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl CameraState {
    /// Follow a viewport change. Only the aspect ratio moves.
    pub fn resize(&mut self, viewport: Viewport) {
        if let Some(aspect) = viewport.aspect() {
            self.aspect = aspect;
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &CameraState) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: the uniform, its buffer and bind group (group 1).
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &CameraState) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Orbits the camera around its target: drag with the left mouse button to
/// rotate, with the right or middle button to pan in screen space, scroll to
/// zoom, and an optional slow spin while idle. Motion eases out with damping.
#[derive(Debug)]
pub struct OrbitController {
    settings: OrbitSettings,
    max_distance: f32,
    rotating: bool,
    panning: bool,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    /// In view heights; x to the right, y downwards like the mouse.
    pan_velocity: Vector2<f32>,
}

impl OrbitController {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            max_distance: settings.max_distance,
            settings,
            rotating: false,
            panning: false,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            pan_velocity: Vector2::zero(),
        }
    }

    /// Forget pending motion after a fresh framing. The distance limit never
    /// pulls the camera closer than where the framing put it.
    pub fn reset(&mut self, camera: &CameraState) {
        self.max_distance = self.settings.max_distance.max(camera.distance());
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
        self.zoom_velocity = 0.0;
        self.pan_velocity = Vector2::zero();
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right | MouseButton::Middle,
                ..
            } => {
                self.panning = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.zoom_velocity -= scroll * 0.1 * self.settings.zoom_speed;
            }
            _ => {}
        }
    }

    /// Raw mouse motion in pixels.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        let (dx, dy) = (dx as f32, dy as f32);
        if self.rotating {
            let scale = 2.0 * PI / 1000.0 * self.settings.rotate_speed;
            self.yaw_velocity -= dx * scale;
            self.pitch_velocity -= dy * scale;
        } else if self.panning {
            self.pan_velocity += Vector2::new(dx, dy) * (self.settings.pan_speed / 1000.0);
        }
    }

    pub fn update(&mut self, camera: &mut CameraState, dt: Duration) {
        let dt = dt.as_secs_f32();
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        if self.settings.auto_rotate && !self.rotating && !self.panning {
            theta -= self.settings.auto_rotate_speed.to_radians() * dt;
        }
        theta += self.yaw_velocity;
        phi = (phi + self.pitch_velocity).clamp(1e-3, PI - 1e-3);
        let radius = (radius * (1.0 + self.zoom_velocity)).min(self.max_distance);

        let direction = Vector3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
        camera.position = camera.target + direction * radius;

        if self.pan_velocity != Vector2::zero() {
            // Position and target move together, so the orbit radius is kept.
            let forward = -direction;
            let right = forward.cross(camera.up).normalize();
            let up = right.cross(forward);
            let view_height = 2.0 * radius * (Rad::from(camera.fov_y).0 / 2.0).tan();
            let shift = (right * -self.pan_velocity.x + up * self.pan_velocity.y) * view_height;
            camera.position += shift;
            camera.target += shift;
        }

        // Velocities decay by `damping` per 60 Hz frame.
        let decay = (1.0 - self.settings.damping).clamp(0.0, 1.0).powf(dt * 60.0);
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;
        self.zoom_velocity *= decay;
        self.pan_velocity *= decay;
    }
}
