use isr_core::Profile;
use isr_macros::{Error, Field, offsets, symbols};

symbols! {
    #[derive(Debug)]
    pub struct ProfileSymbols {
        PsInitialSystemProcess: u64,
        KiSystemCall64: u64,
        PsActiveProcessHead: Option<u64>,
    }
}

offsets! {
    #[derive(Debug)]
    pub struct ProfileOffsets {
        struct _LIST_ENTRY {
            Flink: Field,                   // struct _LIST_ENTRY*
        }

        struct _KPCR {
            Prcb: Field,                    // _KPRCB
        }

        struct _KPRCB {
            CurrentThread: Field,           // _KTHREAD*
        }

        struct _KTHREAD {
            Process: Field,                 // _KPROCESS*
        }

        struct _KPROCESS {
            DirectoryTableBase: Field,      // ULONG_PTR
            UserDirectoryTableBase: Option<Field>,
        }

        struct _EPROCESS {
            UniqueProcessId: Field,         // HANDLE
            InheritedFromUniqueProcessId: Field,
            ImageFileName: Field,           // UCHAR[15]
            ActiveProcessLinks: Field,      // _LIST_ENTRY
            VadRoot: Field,                 // _RTL_AVL_TREE / _MM_AVL_TABLE
        }

        struct _MMVAD_SHORT {
            #[isr(alias = "LeftChild")]
            Left: Field,
            #[isr(alias = "RightChild")]
            Right: Field,
            StartingVpn: Field,
            EndingVpn: Field,
            StartingVpnHigh: Option<Field>, // UCHAR
            EndingVpnHigh: Option<Field>,   // UCHAR
        }
    }
}

fn field(field: &Field) -> super::Field {
    super::Field::new(field.offset(), field.size() as u64)
}

impl super::Offsets {
    /// Extracts the offsets from an ISR profile.
    pub fn new(profile: &Profile) -> Result<Self, Error> {
        let p = ProfileOffsets::new(profile)?;

        Ok(Self {
            _KPCR: super::_KPCR {
                Prcb: field(&p._KPCR.Prcb),
            },
            _KPRCB: super::_KPRCB {
                CurrentThread: field(&p._KPRCB.CurrentThread),
            },
            _KTHREAD: super::_KTHREAD {
                Process: field(&p._KTHREAD.Process),
            },
            _KPROCESS: super::_KPROCESS {
                DirectoryTableBase: field(&p._KPROCESS.DirectoryTableBase),
                UserDirectoryTableBase: p._KPROCESS.UserDirectoryTableBase.as_ref().map(field),
            },
            _EPROCESS: super::_EPROCESS {
                UniqueProcessId: field(&p._EPROCESS.UniqueProcessId),
                InheritedFromUniqueProcessId: field(&p._EPROCESS.InheritedFromUniqueProcessId),
                ImageFileName: field(&p._EPROCESS.ImageFileName),
                ActiveProcessLinks: field(&p._EPROCESS.ActiveProcessLinks),
                VadRoot: field(&p._EPROCESS.VadRoot),
            },
            _LIST_ENTRY: super::_LIST_ENTRY {
                Flink: field(&p._LIST_ENTRY.Flink),
            },
            _MMVAD_SHORT: super::_MMVAD_SHORT {
                Left: field(&p._MMVAD_SHORT.Left),
                Right: field(&p._MMVAD_SHORT.Right),
                StartingVpn: field(&p._MMVAD_SHORT.StartingVpn),
                EndingVpn: field(&p._MMVAD_SHORT.EndingVpn),
                StartingVpnHigh: p._MMVAD_SHORT.StartingVpnHigh.as_ref().map(field),
                EndingVpnHigh: p._MMVAD_SHORT.EndingVpnHigh.as_ref().map(field),
            },
        })
    }
}

impl super::Symbols {
    /// Extracts the symbol RVAs from an ISR profile.
    pub fn new(profile: &Profile) -> Result<Self, Error> {
        let p = ProfileSymbols::new(profile)?;

        Ok(Self {
            PsInitialSystemProcess: p.PsInitialSystemProcess,
            KiSystemCall64: p.KiSystemCall64,
            PsActiveProcessHead: p.PsActiveProcessHead,
        })
    }
}
