use std::rc::Rc;

use ash::vk;

use crate::error::{Result, VkCheck};
use crate::vulkan::device::Device;
use crate::vulkan::mem::{Buffer, VecBufferData};
use crate::vulkan::rt::pipeline::RtPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbtRegion {
    Raygen,
    Miss,
    Hit,
}

/// One table record: the handle of `group` followed by `inline_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbtRecord {
    pub group: u32,
    pub inline_data: Vec<u8>,
}

impl SbtRecord {
    pub fn new(group: u32) -> SbtRecord {
        SbtRecord {
            group,
            inline_data: vec![],
        }
    }

    pub fn with_data(group: u32, inline_data: &[u8]) -> SbtRecord {
        SbtRecord {
            group,
            inline_data: inline_data.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbtSection {
    pub region: SbtRegion,
    pub records: Vec<SbtRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    pub region: SbtRegion,
    pub offset: u64,
    pub stride: u64,
    pub count: u64,
}

/// Placement of every section in the table, computed without touching the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbtLayout {
    handle_size: u64,
    sections: Vec<SbtSection>,
    pub layouts: Vec<SectionLayout>,
    pub size: u64,
}

pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    (value + alignment - 1) / alignment * alignment
}

impl SbtLayout {
    pub fn new(handle_size: u32, base_alignment: u32, sections: Vec<SbtSection>) -> SbtLayout {
        let handle_size = handle_size as u64;
        let mut layouts = Vec::with_capacity(sections.len());
        let mut end = 0u64;

        for section in &sections {
            let max_inline = section
                .records
                .iter()
                .map(|record| record.inline_data.len() as u64)
                .max()
                .unwrap_or(0);
            let stride = align_up(handle_size + max_inline, handle_size);
            let offset = align_up(end, base_alignment as u64);
            let count = section.records.len() as u64;

            layouts.push(SectionLayout {
                region: section.region,
                offset,
                stride,
                count,
            });
            end = offset + stride * count;
        }

        SbtLayout {
            handle_size,
            sections,
            layouts,
            size: end,
        }
    }

    pub fn region(&self, region: SbtRegion) -> Option<&SectionLayout> {
        self.layouts.iter().find(|layout| layout.region == region)
    }

    /// Highest group index any record references.
    pub fn max_group(&self) -> Option<u32> {
        self.sections
            .iter()
            .flat_map(|section| section.records.iter().map(|record| record.group))
            .max()
    }

    /// Table bytes. `handles` holds every group handle back to back, indexed by group.
    pub fn write(&self, handles: &[u8]) -> Vec<u8> {
        let handle_size = self.handle_size as usize;
        let mut table = vec![0u8; self.size as usize];

        for (section, layout) in self.sections.iter().zip(self.layouts.iter()) {
            for (i, record) in section.records.iter().enumerate() {
                let start = (layout.offset + layout.stride * i as u64) as usize;
                let handle_start = record.group as usize * handle_size;
                table[start..start + handle_size].copy_from_slice(&handles[handle_start..handle_start + handle_size]);

                let data_start = start + handle_size;
                table[data_start..data_start + record.inline_data.len()].copy_from_slice(&record.inline_data);
            }
        }

        table
    }
}

pub struct ShaderBindingTable {
    device: Rc<Device>,
    buffer: Buffer,
    layout: SbtLayout,
}

impl ShaderBindingTable {
    pub fn new(device: &Rc<Device>, pipeline: &RtPipeline, sections: Vec<SbtSection>) -> Result<ShaderBindingTable> {
        let rt = &device.raytracing;
        let layout = SbtLayout::new(rt.handle_size(), rt.base_alignment(), sections);

        if let Some(max_group) = layout.max_group() {
            debug_assert!(max_group < pipeline.group_count, "record references missing group {}", max_group);
        }

        let mut handles = vec![0u8; rt.handle_size() as usize * pipeline.group_count as usize];
        unsafe {
            rt.loader
                .get_ray_tracing_shader_group_handles(pipeline.pipeline, 0, pipeline.group_count, &mut handles)
        }
        .check("vkGetRayTracingShaderGroupHandlesNV")?;

        let table = layout.write(&handles);
        let buffer = Buffer::new_host_visible_coherent(
            device,
            &VecBufferData::new(&table),
            vk::BufferUsageFlags::RAY_TRACING_NV,
            "Shader binding table",
        )?;

        log::debug!("Shader binding table: {:?}, {} bytes", layout.layouts, layout.size);

        Ok(ShaderBindingTable {
            device: Rc::clone(device),
            buffer,
            layout,
        })
    }

    pub fn cmd_trace_rays(&self, cmd_buffer: vk::CommandBuffer, width: u32, height: u32) {
        let buffer = self.buffer.get_vk_buffer();
        let region = |region| match self.layout.region(region) {
            Some(layout) => (buffer, layout.offset, layout.stride),
            None => (vk::Buffer::null(), 0, 0),
        };
        let (raygen_buffer, raygen_offset, _) = region(SbtRegion::Raygen);
        let (miss_buffer, miss_offset, miss_stride) = region(SbtRegion::Miss);
        let (hit_buffer, hit_offset, hit_stride) = region(SbtRegion::Hit);

        unsafe {
            self.device.raytracing.loader.cmd_trace_rays(
                cmd_buffer,
                raygen_buffer,
                raygen_offset,
                miss_buffer,
                miss_offset,
                miss_stride,
                hit_buffer,
                hit_offset,
                hit_stride,
                vk::Buffer::null(),
                0,
                0,
                width,
                height,
                1,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections_06() -> Vec<SbtSection> {
        vec![
            SbtSection {
                region: SbtRegion::Raygen,
                records: vec![SbtRecord::new(0)],
            },
            SbtSection {
                region: SbtRegion::Hit,
                records: vec![SbtRecord::new(1)],
            },
            SbtSection {
                region: SbtRegion::Miss,
                records: vec![SbtRecord::new(2)],
            },
        ]
    }

    #[test]
    fn align() {
        assert_eq!(align_up(0, 64), 0);
        assert_eq!(align_up(1, 64), 64);
        assert_eq!(align_up(64, 64), 64);
        assert_eq!(align_up(65, 16), 80);
        assert_eq!(align_up(7, 0), 7);
    }

    #[test]
    fn packed_when_alignment_matches_handle() {
        let layout = SbtLayout::new(16, 16, sections_06());

        let raygen = layout.region(SbtRegion::Raygen).unwrap();
        let hit = layout.region(SbtRegion::Hit).unwrap();
        let miss = layout.region(SbtRegion::Miss).unwrap();
        assert_eq!((raygen.offset, raygen.stride), (0, 16));
        assert_eq!((hit.offset, hit.stride), (16, 16));
        assert_eq!((miss.offset, miss.stride), (32, 16));
        assert_eq!(layout.size, 48);
    }

    #[test]
    fn sections_start_on_base_alignment() {
        let layout = SbtLayout::new(32, 64, sections_06());

        let offsets: Vec<u64> = layout.layouts.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![0, 64, 128]);
        assert_eq!(layout.size, 160);
    }

    #[test]
    fn inline_data_widens_stride() {
        let color: Vec<u8> = [0.5f32, 0.0, 0.0, 0.0].iter().flat_map(|f| f.to_ne_bytes()).collect();
        let sections = vec![
            SbtSection {
                region: SbtRegion::Raygen,
                records: vec![SbtRecord::new(0)],
            },
            SbtSection {
                region: SbtRegion::Miss,
                records: vec![SbtRecord::new(1)],
            },
            SbtSection {
                region: SbtRegion::Hit,
                records: (0..3).map(|_| SbtRecord::with_data(2, &color)).collect(),
            },
        ];
        let layout = SbtLayout::new(16, 16, sections);

        let hit = layout.region(SbtRegion::Hit).unwrap();
        assert_eq!(hit.stride, 32);
        assert_eq!(hit.count, 3);
        assert_eq!(hit.offset, 32);
        assert_eq!(layout.size, 32 + 3 * 32);
    }

    #[test]
    fn stride_rounds_to_handle_size() {
        let sections = vec![SbtSection {
            region: SbtRegion::Hit,
            records: vec![SbtRecord::with_data(0, &[1, 2, 3])],
        }];
        let layout = SbtLayout::new(16, 64, sections);
        assert_eq!(layout.layouts[0].stride, 32);
    }

    #[test]
    fn writes_handles_and_inline_data() {
        let handle_size = 4;
        let sections = vec![
            SbtSection {
                region: SbtRegion::Raygen,
                records: vec![SbtRecord::new(0)],
            },
            SbtSection {
                region: SbtRegion::Hit,
                records: vec![SbtRecord::with_data(1, &[0xaa, 0xbb]), SbtRecord::with_data(1, &[0xcc])],
            },
        ];
        let layout = SbtLayout::new(handle_size, 8, sections);
        let handles = [1, 1, 1, 1, 2, 2, 2, 2];

        let table = layout.write(&handles);
        assert_eq!(table.len() as u64, layout.size);
        assert_eq!(&table[0..4], &[1, 1, 1, 1]);
        // raygen padded up to the hit section at 8
        assert_eq!(&table[4..8], &[0, 0, 0, 0]);
        assert_eq!(&table[8..16], &[2, 2, 2, 2, 0xaa, 0xbb, 0, 0]);
        assert_eq!(&table[16..24], &[2, 2, 2, 2, 0xcc, 0, 0, 0]);
    }

    #[test]
    fn max_group_over_records() {
        let layout = SbtLayout::new(16, 16, sections_06());
        assert_eq!(layout.max_group(), Some(2));
        assert_eq!(SbtLayout::new(16, 16, vec![]).max_group(), None);
    }
}
