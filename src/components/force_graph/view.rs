//! Pan/zoom transform of the canvas group layer, kept apart from layout
//! coordinates.

/// Screen = model * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl ViewTransform {
	pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, k: 1.0 };

	pub fn screen_to_model(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn model_to_screen(&self, mx: f64, my: f64) -> (f64, f64) {
		(mx * self.k + self.x, my * self.k + self.y)
	}

	/// Rescales to `k` keeping the screen point `(ax, ay)` fixed.
	pub fn zoomed_at(&self, k: f64, ax: f64, ay: f64) -> Self {
		let ratio = k / self.k;
		Self {
			x: ax - (ax - self.x) * ratio,
			y: ay - (ay - self.y) * ratio,
			k,
		}
	}

	pub fn lerp(&self, to: &Self, t: f64) -> Self {
		Self {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// An eased transition between two transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomAnimation {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

impl ZoomAnimation {
	pub fn new(from: ViewTransform, to: ViewTransform, duration: f64) -> Self {
		Self {
			from,
			to,
			elapsed: 0.0,
			duration,
		}
	}

	pub fn target(&self) -> ViewTransform {
		self.to
	}

	/// Advances by `dt` seconds and returns the transform to show plus
	/// whether the animation is over.
	pub fn step(&mut self, dt: f64) -> (ViewTransform, bool) {
		self.elapsed += dt;
		if self.duration <= 0.0 || self.elapsed >= self.duration {
			return (self.to, true);
		}
		let t = ease_out_cubic(self.elapsed / self.duration);
		(self.from.lerp(&self.to, t), false)
	}
}
