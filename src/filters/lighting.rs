//! Lighting filters and light nodes.

use nalgebra::Vector3;

use crate::attributes::Attributes;
use crate::color::{resolve_color, Color, ColorF, RGBA};
use crate::parsers::{parse_attribute, set_attribute, NonNegative, NumberOptionalNumber};
use crate::rect::{coord_from_f64, IRect};
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// A light source straight out of the SVG, in primitiveUnits.
#[derive(Debug, Clone, PartialEq)]
enum UntransformedLightSource {
    Distant(FeDistantLight),
    Point(FePointLight),
    Spot(FeSpotLight),
}

impl UntransformedLightSource {
    fn create(name: &str, attrs: &Attributes, session: &Session) -> Option<Self> {
        let mut source = match name {
            "feDistantLight" => UntransformedLightSource::Distant(Default::default()),
            "fePointLight" => UntransformedLightSource::Point(Default::default()),
            "feSpotLight" => UntransformedLightSource::Spot(Default::default()),
            _ => return None,
        };

        match source {
            UntransformedLightSource::Distant(ref mut l) => l.set_attributes(attrs, session),
            UntransformedLightSource::Point(ref mut l) => l.set_attributes(attrs, session),
            UntransformedLightSource::Spot(ref mut l) => l.set_attributes(attrs, session),
        }

        Some(source)
    }

    fn transform(&self, ctx: &PrimitiveContext<'_>) -> LightSource {
        match *self {
            UntransformedLightSource::Distant(ref l) => l.transform(),
            UntransformedLightSource::Point(ref l) => l.transform(ctx),
            UntransformedLightSource::Spot(ref l) => l.transform(ctx),
        }
    }
}

/// A light source in filter space.
#[derive(Debug, Clone, PartialEq)]
pub enum LightSource {
    /// Angles in degrees.
    Distant { azimuth: f64, elevation: f64 },

    Point {
        origin: Vector3<f64>,
    },

    Spot {
        origin: Vector3<f64>,

        /// Unit vector from the origin towards the point the light is aimed at.
        direction: Vector3<f64>,
        specular_exponent: f64,

        /// In degrees.
        limiting_cone_angle: Option<f64>,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeDistantLight {
    azimuth: f64,
    elevation: f64,
}

impl FeDistantLight {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        for (attr, value) in attrs.iter() {
            match attr {
                "azimuth" => set_attribute(&mut self.azimuth, parse_attribute(attr, value), session),
                "elevation" => {
                    set_attribute(&mut self.elevation, parse_attribute(attr, value), session)
                }
                _ => (),
            }
        }
    }

    fn transform(&self) -> LightSource {
        LightSource::Distant {
            azimuth: self.azimuth,
            elevation: self.elevation,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FePointLight {
    x: f64,
    y: f64,
    z: f64,
}

impl FePointLight {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        for (attr, value) in attrs.iter() {
            match attr {
                "x" => set_attribute(&mut self.x, parse_attribute(attr, value), session),
                "y" => set_attribute(&mut self.y, parse_attribute(attr, value), session),
                "z" => set_attribute(&mut self.z, parse_attribute(attr, value), session),
                _ => (),
            }
        }
    }

    fn transform(&self, ctx: &PrimitiveContext<'_>) -> LightSource {
        let (x, y, z) = ctx.point(self.x, self.y, self.z);

        LightSource::Point {
            origin: Vector3::new(x, y, z),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeSpotLight {
    x: f64,
    y: f64,
    z: f64,
    points_at_x: f64,
    points_at_y: f64,
    points_at_z: f64,
    specular_exponent: f64,
    limiting_cone_angle: Option<f64>,
}

impl Default for FeSpotLight {
    fn default() -> FeSpotLight {
        FeSpotLight {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            points_at_x: 0.0,
            points_at_y: 0.0,
            points_at_z: 0.0,
            specular_exponent: 1.0,
            limiting_cone_angle: None,
        }
    }
}

impl FeSpotLight {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        for (attr, value) in attrs.iter() {
            match attr {
                "x" => set_attribute(&mut self.x, parse_attribute(attr, value), session),
                "y" => set_attribute(&mut self.y, parse_attribute(attr, value), session),
                "z" => set_attribute(&mut self.z, parse_attribute(attr, value), session),
                "pointsAtX" => {
                    set_attribute(&mut self.points_at_x, parse_attribute(attr, value), session)
                }
                "pointsAtY" => {
                    set_attribute(&mut self.points_at_y, parse_attribute(attr, value), session)
                }
                "pointsAtZ" => {
                    set_attribute(&mut self.points_at_z, parse_attribute(attr, value), session)
                }
                "specularExponent" => set_attribute(
                    &mut self.specular_exponent,
                    parse_attribute(attr, value),
                    session,
                ),
                "limitingConeAngle" => set_attribute(
                    &mut self.limiting_cone_angle,
                    parse_attribute(attr, value),
                    session,
                ),
                _ => (),
            }
        }
    }

    fn transform(&self, ctx: &PrimitiveContext<'_>) -> LightSource {
        let (x, y, z) = ctx.point(self.x, self.y, self.z);
        let (px, py, pz) = ctx.point(self.points_at_x, self.points_at_y, self.points_at_z);

        let origin = Vector3::new(x, y, z);
        let mut direction = Vector3::new(px, py, pz) - origin;
        let _ = direction.try_normalize_mut(0.0);

        LightSource::Spot {
            origin,
            direction,
            specular_exponent: self.specular_exponent,
            limiting_cone_angle: self.limiting_cone_angle,
        }
    }
}

/// Attributes shared by both lighting primitives.
#[derive(Debug, Clone)]
struct LightingAttributes {
    in1: Input,
    surface_scale: f64,
    kernel_unit_length: Option<(f64, f64)>,
    lighting_color: Color,
    sources: Vec<UntransformedLightSource>,
}

impl Default for LightingAttributes {
    fn default() -> LightingAttributes {
        LightingAttributes {
            in1: Default::default(),
            surface_scale: 1.0,
            kernel_unit_length: None,
            lighting_color: Color::RGBA(RGBA::new(255, 255, 255, 255)),
            sources: Vec::new(),
        }
    }
}

impl LightingAttributes {
    /// Parses `attr` if it is common to both lighting primitives; returns whether it was.
    fn set_attribute(&mut self, attr: &str, value: &str, session: &Session) -> bool {
        match attr {
            "surfaceScale" => {
                set_attribute(&mut self.surface_scale, parse_attribute(attr, value), session)
            }
            "kernelUnitLength" => {
                let parsed = parse_attribute(attr, value)
                    .map(|NumberOptionalNumber(NonNegative(x), NonNegative(y))| Some((x, y)));
                set_attribute(&mut self.kernel_unit_length, parsed, session);
            }
            "lighting-color" => {
                set_attribute(&mut self.lighting_color, parse_attribute(attr, value), session)
            }
            _ => return false,
        }

        true
    }

    fn add_light_source(&mut self, name: &str, attrs: &Attributes, session: &Session) -> bool {
        match UntransformedLightSource::create(name, attrs, session) {
            Some(source) => {
                self.sources.push(source);
                true
            }
            None => false,
        }
    }

    /// Resolves the shared parameters; `None` disables the primitive.
    fn resolve(&self, ctx: &PrimitiveContext<'_>) -> Option<Lighting> {
        let session = ctx.session();

        let source = match self.sources.as_slice() {
            [source] => source,
            sources => {
                fegraph_log!(
                    session,
                    "(lighting filter needs exactly one light source, found {})",
                    sources.len()
                );
                return None;
            }
        };

        let kernel_unit_length = match self.kernel_unit_length {
            Some((x, y)) if x <= 0.0 || y <= 0.0 => return None,
            Some(kul) => Some(ctx.number_pair(kul)),
            None => None,
        };

        Some(Lighting {
            light: source.transform(ctx),
            lighting_color: ColorF::from(resolve_color(
                &self.lighting_color,
                ctx.current_color(),
            )),
            surface_scale: self.surface_scale,
            kernel_unit_length,
        })
    }
}

/// Parameters shared by both resolved lighting primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub light: LightSource,
    pub lighting_color: ColorF,
    pub surface_scale: f64,

    /// In filter-space pixels; `None` means one pixel.
    pub kernel_unit_length: Option<(f64, f64)>,
}

impl Lighting {
    /// Surface normals are computed from neighbors one kernel unit away.
    fn reach(&self) -> (i32, i32) {
        let (kx, ky) = self.kernel_unit_length.unwrap_or((1.0, 1.0));
        (
            coord_from_f64(kx.ceil()).max(1),
            coord_from_f64(ky.ceil()).max(1),
        )
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        let (dx, dy) = self.reach();
        region.inflate(dx, dy)
    }

    pub fn result_change_region(&self, change: &IRegion) -> IRegion {
        self.needed_input_region(change)
    }

    /// Lighting paints the whole subregion, even where the input is transparent.
    pub fn post_filter_extents(&self, subregion: &IRect) -> IRegion {
        IRegion::from_rect(*subregion)
    }
}

/// The `feDiffuseLighting` filter primitive.
#[derive(Debug, Clone)]
pub struct FeDiffuseLighting {
    base: Primitive,
    lighting: LightingAttributes,
    diffuse_constant: f64,
}

impl Default for FeDiffuseLighting {
    fn default() -> FeDiffuseLighting {
        FeDiffuseLighting {
            base: Default::default(),
            lighting: Default::default(),
            diffuse_constant: 1.0,
        }
    }
}

/// The `feSpecularLighting` filter primitive.
#[derive(Debug, Clone)]
pub struct FeSpecularLighting {
    base: Primitive,
    lighting: LightingAttributes,
    specular_constant: f64,
    specular_exponent: f64,
}

impl Default for FeSpecularLighting {
    fn default() -> FeSpecularLighting {
        FeSpecularLighting {
            base: Default::default(),
            lighting: Default::default(),
            specular_constant: 1.0,
            specular_exponent: 1.0,
        }
    }
}

/// Resolved `feDiffuseLighting` primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffuseLighting {
    pub lighting: Lighting,
    pub diffuse_constant: f64,
}

/// Resolved `feSpecularLighting` primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecularLighting {
    pub lighting: Lighting,
    pub specular_constant: f64,

    /// Always within `[1, 128]`.
    pub specular_exponent: f64,
}

impl FeDiffuseLighting {
    pub fn add_light_source(&mut self, name: &str, attrs: &Attributes, session: &Session) -> bool {
        self.lighting.add_light_source(name, attrs, session)
    }

    fn set_specific_attribute(&mut self, attr: &str, value: &str, session: &Session) {
        if attr == "diffuseConstant" {
            let mut c = NonNegative(self.diffuse_constant);
            set_attribute(&mut c, parse_attribute(attr, value), session);
            self.diffuse_constant = c.0;
        }
    }

    fn resolve(&self, ctx: &PrimitiveContext<'_>) -> Option<PrimitiveAttributes> {
        let lighting = self.lighting.resolve(ctx)?;

        Some(PrimitiveAttributes::DiffuseLighting(DiffuseLighting {
            lighting,
            diffuse_constant: self.diffuse_constant,
        }))
    }
}

impl FeSpecularLighting {
    pub fn add_light_source(&mut self, name: &str, attrs: &Attributes, session: &Session) -> bool {
        self.lighting.add_light_source(name, attrs, session)
    }

    fn set_specific_attribute(&mut self, attr: &str, value: &str, session: &Session) {
        match attr {
            "specularConstant" => {
                let mut c = NonNegative(self.specular_constant);
                set_attribute(&mut c, parse_attribute(attr, value), session);
                self.specular_constant = c.0;
            }
            "specularExponent" => set_attribute(
                &mut self.specular_exponent,
                parse_attribute(attr, value),
                session,
            ),
            _ => (),
        }
    }

    fn resolve(&self, ctx: &PrimitiveContext<'_>) -> Option<PrimitiveAttributes> {
        if !(1.0..=128.0).contains(&self.specular_exponent) {
            fegraph_log!(
                ctx.session(),
                "(specularExponent must be in [1, 128], got {})",
                self.specular_exponent
            );
            return None;
        }

        let lighting = self.lighting.resolve(ctx)?;

        Some(PrimitiveAttributes::SpecularLighting(SpecularLighting {
            lighting,
            specular_constant: self.specular_constant,
            specular_exponent: self.specular_exponent,
        }))
    }
}

macro_rules! impl_lighting_filter {
    ($element:ty) => {
        impl FilterEffect for $element {
            fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
                self.lighting.in1 = self.base.parse_one_input(attrs, session);

                for (attr, value) in attrs.iter() {
                    if !self.lighting.set_attribute(attr, value, session) {
                        self.set_specific_attribute(attr, value, session);
                    }
                }
            }

            fn primitive(&self) -> &Primitive {
                &self.base
            }

            fn inputs(&self) -> Vec<Input> {
                vec![self.lighting.in1.clone()]
            }

            fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
                self.resolve(ctx).unwrap_or(PrimitiveAttributes::Empty)
            }
        }
    };
}

impl_lighting_filter!(FeDiffuseLighting);
impl_lighting_filter!(FeSpecularLighting);
